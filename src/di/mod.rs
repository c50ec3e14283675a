//! Dependency Injection
//!
//! The service container that wires repositories, gateways and services.

pub mod container;

pub use container::{Container, ContainerError, Key, Resolver};
