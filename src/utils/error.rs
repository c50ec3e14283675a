//! Error Handling Utilities
//!
//! Error categories, the coded-error contract shared by every service, and
//! the HTTP error envelope rendered by the error registry.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry codes referenced from code. The YAML registry is the source of
/// truth for their messages.
pub mod codes {
    pub const BAD_REQUEST: &str = "400";
    pub const SERVICE_UNAVAILABLE: &str = "503";
    pub const INTERNAL: &str = "1004";
    pub const OTP_DELIVERY_FAILED: &str = "1005";
    pub const INVALID_CREDENTIALS: &str = "2000";
    pub const OTP_EXPIRED: &str = "2001";
    pub const INVALID_OTP: &str = "2002";
    pub const SESSION_EXPIRED: &str = "2003";
    pub const MAX_OTP_ATTEMPTS: &str = "2004";
    pub const PENDING_APPROVAL: &str = "2005";
    pub const ACCOUNT_INACTIVE: &str = "2006";
    pub const WRONG_TOKEN_TYPE: &str = "2007";
    pub const ACCOUNT_NOT_VERIFIED: &str = "2008";
    pub const UNAUTHORIZED: &str = "2009";
    pub const ADMIN_REQUIRED: &str = "2010";
    pub const USER_NOT_FOUND: &str = "3000";
    pub const USER_ALREADY_EXISTS: &str = "3001";
    pub const INVALID_MOBILE: &str = "3002";
    pub const INVALID_PASSWORD: &str = "3003";
    pub const PATIENT_NOT_FOUND: &str = "4000";
    pub const INVALID_PATIENT_DATA: &str = "4001";
    pub const PATIENT_ALREADY_REGISTERED: &str = "4002";
    pub const OPD_MISMATCH: &str = "4003";
    pub const OPD_NOT_FOUND: &str = "5000";
    pub const INVALID_OPD_DATA: &str = "5001";
}

/// How an error is treated at the boundary: logging level, HTTP status and
/// whether internal detail may reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Malformed or missing input, fixable by the caller
    Validation,
    /// Expected outcome of normal operation (duplicate, not approved, ...)
    Business,
    /// Unexpected internal failure
    System,
    /// Database or email gateway failure
    Dependency,
}

impl ErrorCategory {
    /// Status used when a registry entry does not pin one explicitly
    pub fn default_status(self) -> StatusCode {
        match self {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::Business => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::System => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::Dependency => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the internal error text may be shown to the caller
    pub fn exposes_details(self) -> bool {
        matches!(self, ErrorCategory::Validation)
    }
}

/// An error that resolves to an entry of the error registry.
pub trait CodedError: std::error::Error + Send + Sync {
    fn code(&self) -> &'static str;
}

/// Crate-level error for bootstrap, configuration and other failures that
/// do not belong to a single service.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Validation errors for user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CodedError for AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => codes::SERVICE_UNAVAILABLE,
            AppError::Validation(_) => codes::BAD_REQUEST,
            AppError::Migration(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                codes::INTERNAL
            }
        }
    }
}

/// Result type alias for operations that can return AppError
pub type AppResult<T> = Result<T, AppError>;

/// Error payload of an API response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
    pub display_message: String,
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Standard error response structure for API endpoints
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(error: ErrorBody) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

/// A rendered error ready to be returned from a handler.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorResponse) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorResponse {
        &self.body
    }

    pub fn code(&self) -> &str {
        &self.body.error.error_code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn body(category: ErrorCategory) -> ErrorBody {
        ErrorBody {
            error_code: "2000".to_string(),
            message: "Invalid credentials".to_string(),
            display_message: "Invalid email/mobile or password".to_string(),
            category,
            details: None,
        }
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(body(ErrorCategory::Business));
        assert!(!response.success);
        assert_eq!(response.error.error_code, "2000");
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::new(body(ErrorCategory::Business))).unwrap();
        assert!(json["error"].get("details").is_none());
        assert_eq!(json["error"]["category"], "business");
    }

    #[test]
    fn test_category_default_status() {
        assert_eq!(
            ErrorCategory::Validation.default_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCategory::Dependency.default_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(ErrorCategory::Validation.exposes_details());
        assert!(!ErrorCategory::System.exposes_details());
    }

    #[test]
    fn test_app_error_codes() {
        assert_eq!(AppError::Validation("bad".into()).code(), codes::BAD_REQUEST);
        assert_eq!(AppError::Internal("boom".into()).code(), codes::INTERNAL);
        assert_eq!(
            AppError::Database(sqlx::Error::PoolTimedOut).code(),
            codes::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_app_error_display() {
        let error = AppError::Validation("Invalid email".to_string());
        assert_eq!(error.to_string(), "Validation error: Invalid email");
    }

    #[test]
    fn test_api_error_into_response_status() {
        let error = ApiError::new(
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new(body(ErrorCategory::Business)),
        );
        assert_eq!(error.code(), "2000");
        assert_eq!(error.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
