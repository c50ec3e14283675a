//! Repository Traits
//!
//! Storage capabilities consumed by the services. PostgreSQL implementations
//! live in `crate::database`; in-memory ones for tests in
//! `crate::test_support`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use std::future::Future;
use thiserror::Error;

use crate::models::{
    NewOpdRecord, NewOtp, NewPatientVisit, NewUser, OpdRecord, OtpRecord, OtpType, PatientVisit,
    UserWithPassword,
};
use crate::utils::error::{codes, CodedError};

/// Errors raised by any repository implementation
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// A unique constraint rejected the write
    #[error("Duplicate value violates unique constraint {0}")]
    Duplicate(String),

    /// The row a write refers to does not exist
    #[error("Record not found: {0}")]
    Missing(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl RepositoryError {
    /// Connection-level failures worth one retry on an idempotent read
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::Database(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
        )
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, RepositoryError::Duplicate(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return RepositoryError::Duplicate(
                    db.constraint().unwrap_or("unknown").to_string(),
                );
            }
        }
        RepositoryError::Database(err)
    }
}

impl CodedError for RepositoryError {
    fn code(&self) -> &'static str {
        codes::SERVICE_UNAVAILABLE
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Run an idempotent read, retrying once after a transient failure.
/// Writes must never go through here.
pub async fn retry_read<T, F, Fut>(operation: &str, mut read: F) -> RepositoryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RepositoryResult<T>>,
{
    match read().await {
        Err(err) if err.is_transient() => {
            warn!("{} failed with a transient error, retrying once: {}", operation, err);
            read().await
        }
        other => other,
    }
}

/// Staff and admin accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up by normalized email
    async fn get_by_email(&self, email: &str) -> RepositoryResult<Option<UserWithPassword>>;

    async fn get_by_mobile(&self, mobile: &str) -> RepositoryResult<Option<UserWithPassword>>;

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<UserWithPassword>>;

    /// Insert an account; unique mobile/email violations are `Duplicate`
    async fn create(&self, user: NewUser) -> RepositoryResult<UserWithPassword>;

    async fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()>;

    /// Record approval by `approver_id`
    async fn approve(&self, id: i64, approver_id: i64) -> RepositoryResult<UserWithPassword>;

    async fn mark_verified(&self, id: i64) -> RepositoryResult<()>;

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<()>;

    /// Cheap round trip used by the health check
    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

/// One-time codes
#[async_trait]
pub trait OtpRepository: Send + Sync {
    async fn create(&self, otp: NewOtp) -> RepositoryResult<OtpRecord>;

    /// Most recently created record for `(email, otp_type)` that has not
    /// been validated yet
    async fn latest_unvalidated(
        &self,
        email: &str,
        otp_type: OtpType,
    ) -> RepositoryResult<Option<OtpRecord>>;

    /// Claim an unvalidated record. Returns false when it was already
    /// validated, so a code is accepted at most once.
    async fn mark_validated(&self, id: i64) -> RepositoryResult<bool>;

    async fn increment_retry(&self, id: i64) -> RepositoryResult<()>;

    /// Delete records that expired before `now`, returning how many went
    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64>;
}

/// Patient visits and their OPD records
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Insert a visit; a repeated `(opd_id, visit_number)` is `Duplicate`
    async fn create_visit(&self, visit: NewPatientVisit) -> RepositoryResult<PatientVisit>;

    /// All visits for a mobile number, ascending by visit number
    async fn visits_by_mobile(&self, mobile: &str) -> RepositoryResult<Vec<PatientVisit>>;

    async fn latest_visit_by_opd_id(&self, opd_id: &str) -> RepositoryResult<Option<PatientVisit>>;

    async fn create_opd_record(&self, record: NewOpdRecord) -> RepositoryResult<OpdRecord>;

    /// OPD records across all visits of `opd_id`, oldest first
    async fn opd_records_by_opd_id(&self, opd_id: &str) -> RepositoryResult<Vec<OpdRecord>>;
}
