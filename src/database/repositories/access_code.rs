//! Authorization and verification code repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use crate::database::store::{AccessCodeStore, VerificationCodeStore};
use crate::models::access_code::{
    AuthorizationCode, NewAuthorizationCode, EmailVerificationCode, NewVerificationCode,
};
use crate::utils::errors::Result;

const CODE_COLUMNS: &str = "id, code, admin_id, active, phone, created_at, expires_at, last_used_at";

#[derive(Debug, Clone)]
pub struct AccessCodeRepository {
    pool: PgPool,
}

impl AccessCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessCodeStore for AccessCodeRepository {
    async fn replace_active_code(&self, code: NewAuthorizationCode) -> Result<Option<AuthorizationCode>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE authorization_codes SET active = false WHERE admin_id = $1 AND active")
            .bind(code.admin_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO authorization_codes (code, admin_id, active, created_at, expires_at) \
             VALUES ($1, $2, true, $3, $4) \
             RETURNING {CODE_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, AuthorizationCode>(&query)
            .bind(&code.code)
            .bind(code.admin_id)
            .bind(code.created_at)
            .bind(code.expires_at)
            .fetch_one(&mut *tx)
            .await;

        match inserted {
            Ok(issued) => {
                tx.commit().await?;
                Ok(Some(issued))
            }
            // one of the partial unique indexes on active codes fired
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(admin_id = code.admin_id, "Access code insert collided, rolling back");
                tx.rollback().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_active_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        let query = format!("SELECT {CODE_COLUMNS} FROM authorization_codes WHERE code = $1 AND active");
        let found = sqlx::query_as::<_, AuthorizationCode>(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }

    async fn active_code_for_admin(&self, admin_id: i64) -> Result<Option<AuthorizationCode>> {
        let query = format!("SELECT {CODE_COLUMNS} FROM authorization_codes WHERE admin_id = $1 AND active");
        let found = sqlx::query_as::<_, AuthorizationCode>(&query)
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }

    async fn record_code_use(&self, id: i64, phone: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE authorization_codes SET last_used_at = $2, phone = COALESCE($3, phone) WHERE id = $1"
        )
        .bind(id)
        .bind(now)
        .bind(phone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_vigent_code_for_phone(&self, phone: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>> {
        let query = format!(
            "SELECT {CODE_COLUMNS} FROM authorization_codes \
             WHERE phone = $1 AND active AND expires_at > $2 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let found = sqlx::query_as::<_, AuthorizationCode>(&query)
            .bind(phone)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }
}

#[async_trait]
impl VerificationCodeStore for AccessCodeRepository {
    async fn insert_verification_code(&self, code: NewVerificationCode) -> Result<EmailVerificationCode> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE email_verification_codes SET used = true WHERE email = $1 AND NOT used")
            .bind(&code.email)
            .execute(&mut *tx)
            .await?;

        let stored = sqlx::query_as::<_, EmailVerificationCode>(
            r#"
            INSERT INTO email_verification_codes (email, code, used, created_at, expires_at)
            VALUES ($1, $2, false, $3, $4)
            RETURNING id, email, code, used, created_at, expires_at
            "#
        )
        .bind(code.email)
        .bind(code.code)
        .bind(code.created_at)
        .bind(code.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn consume_verification_code(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE email_verification_codes
            SET used = true
            WHERE email = $1 AND code = $2 AND NOT used AND expires_at > $3
            "#
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_verification_codes(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM email_verification_codes WHERE expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
