//! Database Connection Management
//!
//! Utilities for managing PostgreSQL connections with SQLx.

use sqlx::PgPool;
use std::time::Duration;

use crate::config::env;
use crate::utils::error::{AppError, AppResult};

/// Database connection pool type alias for convenience
pub type DatabasePool = PgPool;

/// Database configuration for connection setup
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/hospital".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(3600),
        }
    }
}

impl DatabaseConfig {
    /// Create database configuration from environment variables.
    /// `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            url: env::get_required("DATABASE_URL")?,
            max_connections: env::get_u32("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env::get_u32("DB_MIN_CONNECTIONS", defaults.min_connections),
            connect_timeout: Duration::from_secs(env::get_u64(
                "DB_CONNECT_TIMEOUT",
                defaults.connect_timeout.as_secs(),
            )),
            idle_timeout: Duration::from_secs(env::get_u64(
                "DB_IDLE_TIMEOUT",
                defaults.idle_timeout.as_secs(),
            )),
            max_lifetime: Duration::from_secs(env::get_u64(
                "DB_MAX_LIFETIME",
                defaults.max_lifetime.as_secs(),
            )),
        })
    }

    /// Check pool sizing
    pub fn validate(&self) -> AppResult<()> {
        if self.max_connections == 0 {
            return Err(AppError::Configuration(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(AppError::Configuration(
                "Database min_connections cannot be greater than max_connections".into(),
            ));
        }

        Ok(())
    }

    /// Create a database connection pool from this configuration
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(&self.url)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_rejects_inverted_pool_bounds() {
        let config = DatabaseConfig {
            min_connections: 20,
            max_connections: 5,
            ..DatabaseConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_database_config_rejects_empty_pool() {
        let config = DatabaseConfig {
            max_connections: 0,
            min_connections: 0,
            ..DatabaseConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
