//! Enrollment repository implementation
//!
//! Every status change locks the enrollment row, then the event row, and lets
//! the ledger decide before anything is written.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use crate::database::store::EnrollmentStore;
use crate::models::enrollment::{Enrollment, CreateEnrollmentRequest, UpdateEnrollmentRequest};
use crate::services::ledger::{self, LedgerEffect};
use crate::utils::errors::{Result, SportsHubError};
use super::event::{lock_capacity, store_capacity};

const ENROLLMENT_COLUMNS: &str = "id, user_id, event_id, status, attended, comment, created_at";

#[derive(Debug, Clone)]
pub struct EnrollmentRepository {
    pool: PgPool,
}

impl EnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for EnrollmentRepository {
    async fn create_enrollment(&self, request: CreateEnrollmentRequest) -> Result<Enrollment> {
        let mut tx = self.pool.begin().await?;

        let mut capacity = lock_capacity(&mut tx, request.event_id).await?;
        let effect = LedgerEffect::plan(None, Some(request.status));
        if ledger::apply(request.event_id, &mut capacity, effect)?.changed() {
            store_capacity(&mut tx, request.event_id, capacity).await?;
        }

        let query = format!(
            "INSERT INTO enrollments (user_id, event_id, status, attended, comment, created_at) \
             VALUES ($1, $2, $3, false, $4, $5) \
             RETURNING {ENROLLMENT_COLUMNS}"
        );
        let enrollment = sqlx::query_as::<_, Enrollment>(&query)
            .bind(request.user_id)
            .bind(request.event_id)
            .bind(request.status.as_str())
            .bind(request.comment)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(enrollment)
    }

    async fn find_enrollment(&self, id: i64) -> Result<Option<Enrollment>> {
        let query = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1");
        let enrollment = sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(enrollment)
    }

    async fn update_enrollment(&self, id: i64, request: UpdateEnrollmentRequest) -> Result<Enrollment> {
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| SportsHubError::not_found("enrollment", id))?;

        if let Some(status) = request.status {
            let effect = LedgerEffect::plan(Some(current.status), Some(status));
            if effect != LedgerEffect::None {
                let mut capacity = lock_capacity(&mut tx, current.event_id).await?;
                if ledger::apply(current.event_id, &mut capacity, effect)?.changed() {
                    store_capacity(&mut tx, current.event_id, capacity).await?;
                }
            } else {
                debug!(enrollment_id = id, "Status change does not touch capacity");
            }
        }

        let query = format!(
            "UPDATE enrollments \
             SET status = COALESCE($2, status), \
                 attended = COALESCE($3, attended), \
                 comment = COALESCE($4, comment) \
             WHERE id = $1 \
             RETURNING {ENROLLMENT_COLUMNS}"
        );
        let enrollment = sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .bind(request.status.map(|s| s.as_str()))
            .bind(request.attended)
            .bind(request.comment)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(enrollment)
    }

    async fn delete_enrollment(&self, id: i64) -> Result<Enrollment> {
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| SportsHubError::not_found("enrollment", id))?;

        let effect = LedgerEffect::plan(Some(current.status), None);
        if effect != LedgerEffect::None {
            let mut capacity = lock_capacity(&mut tx, current.event_id).await?;
            if ledger::apply(current.event_id, &mut capacity, effect)?.changed() {
                store_capacity(&mut tx, current.event_id, capacity).await?;
            }
        }

        sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(current)
    }

    async fn list_event_enrollments(&self, event_id: i64) -> Result<Vec<Enrollment>> {
        let query = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE event_id = $1 ORDER BY id ASC");
        let enrollments = sqlx::query_as::<_, Enrollment>(&query)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(enrollments)
    }

    async fn list_user_enrollments(&self, user_id: i64) -> Result<Vec<Enrollment>> {
        let query = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 ORDER BY id ASC");
        let enrollments = sqlx::query_as::<_, Enrollment>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(enrollments)
    }
}
