//! Dependency Container
//!
//! Maps typed capability keys to shared instances. Instances are either
//! registered eagerly or built on first use by a factory that may resolve
//! its own dependencies. Built instances are cached, so every later resolve
//! of a key returns the same `Arc`.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use thiserror::Error;

use crate::utils::error::{codes, CodedError};

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, ContainerError> + Send + Sync>;

/// Name of a capability together with the type it resolves to.
///
/// Keys are declared as constants, e.g.
/// `const MAILER: Key<dyn Mailer> = Key::new("mailer");`.
pub struct Key<T: ?Sized> {
    name: &'static str,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: ?Sized> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Key<T> {}

impl<T: ?Sized> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}: {})", self.name, type_name::<T>())
    }
}

/// Errors reported to the caller of `resolve`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Service '{0}' is not registered")]
    NotRegistered(&'static str),

    /// The chain lists every key being resolved, ending with the key that
    /// was requested a second time
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<&'static str> },

    #[error("Service '{key}' is not a {expected}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },

    #[error("Factory for '{key}' failed: {reason}")]
    Factory { key: &'static str, reason: String },
}

impl ContainerError {
    /// Wrap a construction failure inside a factory
    pub fn factory(key: &'static str, err: impl fmt::Display) -> Self {
        ContainerError::Factory {
            key,
            reason: err.to_string(),
        }
    }
}

impl CodedError for ContainerError {
    fn code(&self) -> &'static str {
        codes::INTERNAL
    }
}

/// Registry of shared services.
///
/// Safe to share between threads. Locks are never held while a factory
/// runs, so factories may resolve other keys freely.
#[derive(Default)]
pub struct Container {
    instances: RwLock<HashMap<&'static str, Instance>>,
    factories: RwLock<HashMap<&'static str, Factory>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an already-built instance, replacing any previous binding.
    pub fn register<T>(&self, key: Key<T>, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        write(&self.factories).remove(key.name);
        write(&self.instances).insert(key.name, Arc::new(instance));
        debug!("Registered instance for '{}'", key.name);
    }

    /// Bind a lazy constructor, replacing any previous binding and dropping
    /// an instance cached from it.
    ///
    /// The factory must resolve its dependencies through the [`Resolver`] it
    /// is given. Cycles are only detected along that chain: a factory that
    /// captures the container and calls [`Container::resolve`] starts a new
    /// chain, and a cycle through it recurses without bound.
    pub fn register_factory<T, F>(&self, key: Key<T>, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, ContainerError> + Send + Sync + 'static,
    {
        let erased: Factory = Arc::new(move |resolver: &Resolver<'_>| {
            factory(resolver).map(|instance| Arc::new(instance) as Instance)
        });

        write(&self.instances).remove(key.name);
        write(&self.factories).insert(key.name, erased);
        debug!("Registered factory for '{}'", key.name);
    }

    /// Resolve a key, building it and its dependencies on first use.
    pub fn resolve<T>(&self, key: Key<T>) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Resolver::new(self).resolve(key)
    }

    pub fn is_registered<T: ?Sized>(&self, key: Key<T>) -> bool {
        read(&self.instances).contains_key(key.name) || read(&self.factories).contains_key(key.name)
    }

    fn cached(&self, name: &'static str) -> Option<Instance> {
        read(&self.instances).get(name).cloned()
    }

    fn factory(&self, name: &'static str) -> Option<Factory> {
        read(&self.factories).get(name).cloned()
    }

    /// Cache a freshly built instance unless a concurrent resolve got there
    /// first, and return whichever instance ended up cached.
    fn store(&self, name: &'static str, instance: Instance) -> Instance {
        write(&self.instances)
            .entry(name)
            .or_insert(instance)
            .clone()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut instances: Vec<_> = read(&self.instances).keys().copied().collect();
        let mut factories: Vec<_> = read(&self.factories).keys().copied().collect();
        instances.sort_unstable();
        factories.sort_unstable();

        f.debug_struct("Container")
            .field("instances", &instances)
            .field("factories", &factories)
            .finish()
    }
}

/// One resolution in progress.
///
/// Factories receive the resolver so that nested resolves share the chain
/// of keys under construction. Each top-level `Container::resolve` starts a
/// fresh chain, so threads racing on the same key never see each other's
/// marks.
pub struct Resolver<'a> {
    container: &'a Container,
    chain: RefCell<Vec<&'static str>>,
}

impl<'a> Resolver<'a> {
    fn new(container: &'a Container) -> Self {
        Self {
            container,
            chain: RefCell::new(Vec::new()),
        }
    }

    pub fn resolve<T>(&self, key: Key<T>) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.chain.borrow().contains(&key.name) {
            let mut chain = self.chain.borrow().clone();
            chain.push(key.name);
            return Err(ContainerError::CircularDependency { chain });
        }

        if let Some(instance) = self.container.cached(key.name) {
            return downcast(key, &instance);
        }

        let factory = self
            .container
            .factory(key.name)
            .ok_or(ContainerError::NotRegistered(key.name))?;

        self.chain.borrow_mut().push(key.name);
        let built = factory(self);
        self.chain.borrow_mut().pop();

        let instance = self.container.store(key.name, built?);
        debug!("Resolved '{}'", key.name);
        downcast(key, &instance)
    }
}

fn downcast<T>(key: Key<T>, instance: &Instance) -> Result<Arc<T>, ContainerError>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(ContainerError::TypeMismatch {
            key: key.name,
            expected: type_name::<T>(),
        })
}

fn read<V>(lock: &RwLock<V>) -> RwLockReadGuard<'_, V> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<V>(lock: &RwLock<V>) -> RwLockWriteGuard<'_, V> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
