//! Database Module
//!
//! Connection management and the PostgreSQL implementations of the
//! repository traits.

pub mod connection;
pub mod otps;
pub mod patients;
pub mod users;

// Re-export commonly used types
pub use connection::{DatabaseConfig, DatabasePool};
pub use otps::PgOtpRepository;
pub use patients::PgPatientRepository;
pub use users::PgUserRepository;
