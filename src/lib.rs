//! Hospital Service Library
//!
//! Backend for a hospital's internal management: staff and admin
//! authentication with email OTPs and JWTs, patient registration with
//! revisit tracking, and OPD consultation records.
//!
//! # Features
//!
//! - **Lazy Dependency Container**: services are built on first use, cached as
//!   singletons, with circular dependencies reported instead of overflowing
//! - **Error Registry**: every failure carries a code resolved against a YAML
//!   table of messages, categories and HTTP statuses
//! - **Staff Authentication**: bcrypt passwords, 6-digit email OTPs, HS256
//!   access and refresh tokens, admin approval of staff accounts
//! - **Patient Registration**: lookup by mobile number, OPD ids stable across
//!   visits, field-by-field merge on revisits
//! - **Flexible Router**: route groups enabled through `RouterBuilder`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hospital_service::{
//!     api::{AppState, RouterBuilder},
//!     app::{build_container, Infrastructure},
//!     config::AppConfig,
//!     utils::ErrorRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let pool = config.database.create_pool().await?;
//!
//!     let infrastructure = Infrastructure::postgres(pool, config.email.as_ref())?;
//!     let container = build_container(config, infrastructure);
//!     let state = AppState::new(container, Arc::new(ErrorRegistry::embedded()?));
//!
//!     // Only staff authentication, no patient routes
//!     let app = RouterBuilder::with_auth_routes().build(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: handlers resolve services from the container per request
//! - **Service Layer**: auth and patient orchestrators over OTP, token and
//!   credential services
//! - **Repository Layer**: storage traits with PostgreSQL implementations
//! - **Models**: data structures and request/response types
//! - **Utils**: error registry, validation and security helpers

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Container keys and service wiring
pub mod app;

/// Configuration management for all service settings
pub mod config;

/// Database connection management and PostgreSQL repositories
pub mod database;

/// Dependency container
pub mod di;

/// Data models and request/response structures
pub mod models;

/// Storage traits consumed by the services
pub mod repository;

/// Authentication, OTP, token, email and patient services
pub mod service;

/// In-memory repositories and mailer for tests
pub mod test_support;

/// Shared utilities for security, validation, and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_routes, AppState, RouterBuilder};
pub use app::{build_container, Infrastructure};
pub use di::{Container, ContainerError, Key};
pub use models::{TokenPair, User, UserContext};
pub use service::{AuthService, PatientService};
pub use utils::error::{ApiError, ApiResult, AppError, AppResult, CodedError, ErrorResponse};
pub use utils::ErrorRegistry;

// Re-export database utilities for configuration
pub use database::{DatabaseConfig, DatabasePool};

// Re-export configuration system
pub use config::{env, AppConfig, EmailConfig, JwtConfig, OtpConfig, SecurityConfig, ServerConfig};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
