//! Error Registry
//!
//! Maps error codes to a log message, a user-facing message and a category.
//! The table is parsed from YAML once at startup and never mutated, so a
//! shared `Arc<ErrorRegistry>` can be read from any number of requests.

use std::collections::HashMap;
use std::path::Path;

use axum::http::StatusCode;
use log::{debug, error, info};
use serde::Deserialize;
use thiserror::Error;

use super::error::{ApiError, CodedError, ErrorBody, ErrorCategory, ErrorResponse};

/// Registry bundled with the binary
const EMBEDDED_REGISTRY: &str = include_str!("../../config/errors.yaml");

/// A single registry entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEntry {
    /// Message written to logs
    pub message: String,
    /// Message shown to API callers
    pub display_message: String,
    pub category: ErrorCategory,
    /// Explicit HTTP status, otherwise derived from the category
    #[serde(default)]
    pub status: Option<u16>,
}

impl ErrorEntry {
    /// Record returned for codes missing from the table
    pub fn fallback() -> Self {
        Self {
            message: "An error occurred".to_string(),
            display_message: "Something went wrong. Please try again.".to_string(),
            category: ErrorCategory::System,
            status: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
            .and_then(|status| StatusCode::from_u16(status).ok())
            .unwrap_or_else(|| self.category.default_status())
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    errors: HashMap<String, ErrorEntry>,
}

/// Failures while loading the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read error registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse error registry: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("error registry contains no entries")]
    Empty,
}

/// Read-only lookup table from error code to [`ErrorEntry`]
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    entries: HashMap<String, ErrorEntry>,
    fallback: ErrorEntry,
}

impl ErrorRegistry {
    /// Parse a registry from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        if file.errors.is_empty() {
            return Err(RegistryError::Empty);
        }

        Ok(Self {
            entries: file.errors,
            fallback: ErrorEntry::fallback(),
        })
    }

    /// Load a registry from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// The registry compiled into the binary
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::from_yaml_str(EMBEDDED_REGISTRY)
    }

    /// Load from `path` when given, otherwise use the embedded registry
    pub fn load(path: Option<&str>) -> Result<Self, RegistryError> {
        match path {
            Some(path) => {
                info!("Loading error registry from {}", path);
                Self::from_file(path)
            }
            None => Self::embedded(),
        }
    }

    /// Look up a code, never failing: unknown codes get the fallback record.
    pub fn lookup(&self, code: &str) -> &ErrorEntry {
        self.entries.get(code).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Log an error according to its category and build the HTTP response
    /// for it. Internal detail only reaches the caller for validation errors.
    pub fn render<E>(&self, err: &E) -> ApiError
    where
        E: CodedError + ?Sized,
    {
        let code = err.code();
        let entry = self.lookup(code);

        match entry.category {
            ErrorCategory::Validation => debug!("[{}] {}: {}", code, entry.message, err),
            ErrorCategory::Business => info!("[{}] {}: {}", code, entry.message, err),
            ErrorCategory::System | ErrorCategory::Dependency => {
                error!("[{}] {}: {:?}", code, entry.message, err)
            }
        }

        let details = entry
            .category
            .exposes_details()
            .then(|| err.to_string());

        ApiError::new(
            entry.status_code(),
            ErrorResponse::new(ErrorBody {
                error_code: code.to_string(),
                message: entry.message.clone(),
                display_message: entry.display_message.clone(),
                category: entry.category,
                details,
            }),
        )
    }
}
