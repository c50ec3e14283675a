//! Utilities Module
//!
//! Shared utilities for error handling, the error registry, security and
//! validation used throughout the hospital service.

pub mod error;
pub mod error_registry;
pub mod security;
pub mod validation;

// Re-export commonly used utilities
pub use error::{ApiError, ApiResult, AppError, AppResult, CodedError, ErrorCategory, ErrorResponse};
pub use error_registry::{ErrorEntry, ErrorRegistry, RegistryError};
pub use security::*;
pub use validation::*;
