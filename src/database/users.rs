//! PostgreSQL user repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{NewUser, UserWithPassword};
use crate::repository::{RepositoryError, RepositoryResult, UserRepository};

const USER_COLUMNS: &str = "id, name, mobile, email, designation, status, is_admin, is_approved, \
     is_verified, approved_by, password_hash, created_at, updated_at, last_login";

pub struct PgUserRepository {
    db_pool: PgPool,
}

impl PgUserRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> RepositoryResult<Option<UserWithPassword>> {
        let query = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, predicate);
        let user = sqlx::query_as::<_, UserWithPassword>(&query)
            .bind(value)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_email(&self, email: &str) -> RepositoryResult<Option<UserWithPassword>> {
        self.fetch_one_where("email", email).await
    }

    async fn get_by_mobile(&self, mobile: &str) -> RepositoryResult<Option<UserWithPassword>> {
        self.fetch_one_where("mobile", mobile).await
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<UserWithPassword>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserWithPassword>(&query)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(user)
    }

    async fn create(&self, user: NewUser) -> RepositoryResult<UserWithPassword> {
        let query = format!(
            r#"
            INSERT INTO users (name, mobile, email, designation, is_admin, is_approved, is_verified, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let created = sqlx::query_as::<_, UserWithPassword>(&query)
            .bind(&user.name)
            .bind(&user.mobile)
            .bind(&user.email)
            .bind(user.designation)
            .bind(user.is_admin)
            .bind(user.is_approved)
            .bind(user.is_verified)
            .bind(&user.password_hash)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(created)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.db_pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing(format!("users/{}", id)));
        }
        Ok(())
    }

    async fn approve(&self, id: i64, approver_id: i64) -> RepositoryResult<UserWithPassword> {
        let query = format!(
            r#"
            UPDATE users
            SET is_approved = TRUE, approved_by = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, UserWithPassword>(&query)
            .bind(id)
            .bind(approver_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| RepositoryError::Missing(format!("users/{}", id)))
    }

    async fn mark_verified(&self, id: i64) -> RepositoryResult<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}
