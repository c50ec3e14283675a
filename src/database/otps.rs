//! PostgreSQL OTP repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{NewOtp, OtpRecord, OtpType};
use crate::repository::{OtpRepository, RepositoryResult};

const OTP_COLUMNS: &str = "id, mobile, email, otp_code, otp_type, expires_at, is_validated, \
     retry_count, created_at, updated_at";

pub struct PgOtpRepository {
    db_pool: PgPool,
}

impl PgOtpRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OtpRepository for PgOtpRepository {
    async fn create(&self, otp: NewOtp) -> RepositoryResult<OtpRecord> {
        let query = format!(
            r#"
            INSERT INTO otps (mobile, email, otp_code, otp_type, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            OTP_COLUMNS
        );

        let record = sqlx::query_as::<_, OtpRecord>(&query)
            .bind(&otp.mobile)
            .bind(&otp.email)
            .bind(&otp.otp_code)
            .bind(otp.otp_type)
            .bind(otp.expires_at)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(record)
    }

    async fn latest_unvalidated(
        &self,
        email: &str,
        otp_type: OtpType,
    ) -> RepositoryResult<Option<OtpRecord>> {
        let query = format!(
            r#"
            SELECT {}
            FROM otps
            WHERE email = $1 AND otp_type = $2 AND is_validated = FALSE
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            OTP_COLUMNS
        );

        let record = sqlx::query_as::<_, OtpRecord>(&query)
            .bind(email)
            .bind(otp_type)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(record)
    }

    async fn mark_validated(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE otps SET is_validated = TRUE, updated_at = NOW() \
             WHERE id = $1 AND is_validated = FALSE",
        )
        .bind(id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_retry(&self, id: i64) -> RepositoryResult<()> {
        sqlx::query(
            "UPDATE otps SET retry_count = retry_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM otps WHERE expires_at < $1")
            .bind(now)
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected())
    }
}
