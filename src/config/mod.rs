//! Configuration Module
//!
//! Centralized configuration for the hospital service: HTTP server,
//! database, JWT, OTP policy, password hashing, SMTP and hospital identity.

use crate::database::DatabaseConfig;
use crate::utils::error::{AppError, AppResult};

/// Placeholder secret shipped as the default; refused in production
pub const DEFAULT_JWT_SECRET: &str = "change-this-secret-in-production";

/// Environment variable helpers
pub mod env {
    use std::env;

    use crate::utils::error::AppError;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get environment variable as boolean with default
    pub fn get_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u32 with default
    pub fn get_u32(key: &str, default: u32) -> u32 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get an optional u32; unset or unparsable values yield `None`
    pub fn get_optional_u32(key: &str) -> Option<u32> {
        env::var(key).ok().and_then(|v| v.parse().ok())
    }

    /// Get an optional, non-empty string
    pub fn get_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    /// Check if environment variable is set
    pub fn is_set(key: &str) -> bool {
        env::var(key).is_ok()
    }

    /// Get a required environment variable
    pub fn get_required(key: &str) -> Result<String, AppError> {
        env::var(key).map_err(|_| {
            AppError::Configuration(format!("Required environment variable {} is not set", key))
        })
    }
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Deployment environment (`development`, `production`, ...)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// OTP configuration
    pub otp: OtpConfig,

    /// Password hashing configuration
    pub security: SecurityConfig,

    /// Email configuration, `None` when SMTP is not configured
    pub email: Option<EmailConfig>,

    /// Hospital identity used in emails and OPD ids
    pub hospital: HospitalConfig,

    /// Alternative error registry file
    pub error_registry_path: Option<String>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_minutes: i64,
    pub refresh_token_expires_days: i64,
    pub issuer: String,
}

/// OTP configuration
#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub expiration_minutes: i64,
    /// Failed attempts allowed before a code is exhausted; unlimited when `None`
    pub max_retries: Option<u32>,
    pub cleanup_interval_seconds: u64,
}

/// Password hashing configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
}

/// Email service configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_name: String,
    pub from_email: String,
}

/// Hospital identity
#[derive(Debug, Clone)]
pub struct HospitalConfig {
    /// Display name used in emails
    pub name: String,
    /// Prefix of generated OPD ids
    pub tag: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_u16("SERVER_PORT", 8080),
            cors_origins: env::get_string("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: env::get_string("JWT_SECRET", DEFAULT_JWT_SECRET),
            access_token_expires_minutes: env::get_i64("JWT_ACCESS_EXPIRES_MINUTES", 60),
            refresh_token_expires_days: env::get_i64("JWT_REFRESH_EXPIRES_DAYS", 7),
            issuer: env::get_string("JWT_ISSUER", "lael-hospital"),
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expiration_minutes: env::get_i64("OTP_EXPIRATION_MINUTES", 5),
            max_retries: env::get_optional_u32("OTP_MAX_RETRIES"),
            cleanup_interval_seconds: env::get_u64("OTP_CLEANUP_INTERVAL_SECONDS", 3600),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: env::get_u32("BCRYPT_COST", crate::utils::DEFAULT_BCRYPT_COST),
        }
    }
}

impl Default for HospitalConfig {
    fn default() -> Self {
        Self {
            name: env::get_string("HOSPITAL_NAME", "Lael Hospital"),
            tag: env::get_string("HOSPITAL_TAG", "LAEL"),
        }
    }
}

impl EmailConfig {
    /// SMTP settings, or `None` when `SMTP_HOST` is unset
    pub fn from_env() -> AppResult<Option<Self>> {
        if !env::is_set("SMTP_HOST") {
            return Ok(None);
        }

        Ok(Some(Self {
            smtp_host: env::get_required("SMTP_HOST")?,
            smtp_port: env::get_u16("SMTP_PORT", 587),
            smtp_username: env::get_required("SMTP_USERNAME")?,
            smtp_password: env::get_required("SMTP_PASSWORD")?,
            from_name: env::get_string("SMTP_FROM_NAME", "Lael Hospital"),
            from_email: env::get_string("SMTP_FROM_EMAIL", "noreply@laelhospital.com"),
        }))
    }
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            environment: env::get_string("APP_ENV", "development"),
            server: ServerConfig::default(),
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::default(),
            otp: OtpConfig::default(),
            security: SecurityConfig::default(),
            email: EmailConfig::from_env()?,
            hospital: HospitalConfig::default(),
            error_registry_path: env::get_optional("ERROR_REGISTRY_PATH"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration(
                "Server port must be greater than 0".into(),
            ));
        }

        self.database.validate()?;

        if self.jwt.secret.is_empty() {
            return Err(AppError::Configuration("JWT secret cannot be empty".into()));
        }

        if self.is_production() && self.jwt.secret == DEFAULT_JWT_SECRET {
            return Err(AppError::Configuration(
                "JWT_SECRET must be changed in production".into(),
            ));
        }

        if self.jwt.access_token_expires_minutes <= 0 || self.jwt.refresh_token_expires_days <= 0
        {
            return Err(AppError::Configuration(
                "JWT token lifetimes must be positive".into(),
            ));
        }

        if self.otp.expiration_minutes <= 0 {
            return Err(AppError::Configuration(
                "OTP expiration must be positive".into(),
            ));
        }

        if self.otp.cleanup_interval_seconds == 0 {
            return Err(AppError::Configuration(
                "OTP cleanup interval must be greater than 0".into(),
            ));
        }

        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(AppError::Configuration(
                "BCRYPT_COST must be between 4 and 31".into(),
            ));
        }

        if self.hospital.tag.is_empty()
            || !self.hospital.tag.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AppError::Configuration(
                "HOSPITAL_TAG must be a non-empty alphanumeric string".into(),
            ));
        }

        Ok(())
    }
}
