//! Pending event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use crate::database::store::PendingEventStore;
use crate::models::event::{Event, CreateEventRequest};
use crate::models::pending_event::{PendingEvent, NewPendingEvent, DraftStatus, DraftFields, Completeness};
use crate::utils::errors::{Result, SportsHubError};
use super::event::insert_event;

const DRAFT_COLUMNS: &str = "\
    id, token, draft_fields, image_payload, status, data_complete, missing_fields, \
    created_at, expires_at";

#[derive(Debug, Clone)]
pub struct PendingEventRepository {
    pool: PgPool,
}

impl PendingEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn not_pending(token: &str, status: DraftStatus) -> SportsHubError {
    SportsHubError::DraftNotPending {
        token: token.to_string(),
        status: status.as_str().to_string(),
    }
}

#[async_trait]
impl PendingEventStore for PendingEventRepository {
    async fn insert_draft(&self, draft: NewPendingEvent) -> Result<PendingEvent> {
        let query = format!(
            "INSERT INTO pending_events (token, draft_fields, image_payload, status, data_complete, \
             missing_fields, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {DRAFT_COLUMNS}"
        );
        let pending = sqlx::query_as::<_, PendingEvent>(&query)
            .bind(draft.token)
            .bind(Json(draft.draft_fields))
            .bind(draft.image_payload)
            .bind(DraftStatus::Pending.as_str())
            .bind(draft.completeness.data_complete)
            .bind(draft.completeness.missing_fields)
            .bind(draft.created_at)
            .bind(draft.expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(pending)
    }

    async fn find_draft(&self, token: &str) -> Result<Option<PendingEvent>> {
        let query = format!("SELECT {DRAFT_COLUMNS} FROM pending_events WHERE token = $1");
        let pending = sqlx::query_as::<_, PendingEvent>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pending)
    }

    async fn update_draft_fields(
        &self,
        token: &str,
        fields: DraftFields,
        completeness: Completeness,
    ) -> Result<PendingEvent> {
        let mut tx = self.pool.begin().await?;

        let status: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM pending_events WHERE token = $1 FOR UPDATE"
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;
        let status = match status {
            Some((status,)) => DraftStatus::try_from(status)
                .map_err(|e| SportsHubError::InvalidInput(e.to_string()))?,
            None => return Err(SportsHubError::not_found("pending event", token)),
        };
        if status != DraftStatus::Pending {
            return Err(not_pending(token, status));
        }

        let query = format!(
            "UPDATE pending_events SET draft_fields = $2, data_complete = $3, missing_fields = $4 \
             WHERE token = $1 \
             RETURNING {DRAFT_COLUMNS}"
        );
        let pending = sqlx::query_as::<_, PendingEvent>(&query)
            .bind(token)
            .bind(Json(fields))
            .bind(completeness.data_complete)
            .bind(completeness.missing_fields)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(pending)
    }

    async fn set_draft_status(&self, token: &str, status: DraftStatus) -> Result<PendingEvent> {
        let query = format!(
            "UPDATE pending_events SET status = $2 WHERE token = $1 RETURNING {DRAFT_COLUMNS}"
        );
        sqlx::query_as::<_, PendingEvent>(&query)
            .bind(token)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SportsHubError::not_found("pending event", token))
    }

    async fn expire_draft(&self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pending_events SET status = $2 WHERE token = $1 AND status = $3 AND expires_at <= $4"
        )
        .bind(token)
        .bind(DraftStatus::Rejected.as_str())
        .bind(DraftStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn claim_draft(&self, token: &str, now: DateTime<Utc>) -> Result<PendingEvent> {
        let query = format!(
            "UPDATE pending_events SET status = $2 \
             WHERE token = $1 AND status = $3 AND expires_at > $4 \
             RETURNING {DRAFT_COLUMNS}"
        );
        let claimed = sqlx::query_as::<_, PendingEvent>(&query)
            .bind(token)
            .bind(DraftStatus::Promoting.as_str())
            .bind(DraftStatus::Pending.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(draft) = claimed {
            return Ok(draft);
        }

        // Nothing claimed: report why
        let draft = self
            .find_draft(token)
            .await?
            .ok_or_else(|| SportsHubError::not_found("pending event", token))?;
        if draft.status != DraftStatus::Pending {
            return Err(not_pending(token, draft.status));
        }
        if self.expire_draft(token, now).await? {
            return Err(SportsHubError::ExpiredDraft { token: token.to_string() });
        }

        // Changed hands between the two statements
        let status = self
            .find_draft(token)
            .await?
            .map(|draft| draft.status)
            .unwrap_or(DraftStatus::Rejected);
        Err(not_pending(token, status))
    }

    async fn release_draft(&self, token: &str) -> Result<()> {
        sqlx::query("UPDATE pending_events SET status = $2 WHERE token = $1 AND status = $3")
            .bind(token)
            .bind(DraftStatus::Pending.as_str())
            .bind(DraftStatus::Promoting.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn promote_draft(&self, token: &str, request: CreateEventRequest, now: DateTime<Utc>) -> Result<Event> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT status, expires_at FROM pending_events WHERE token = $1 FOR UPDATE"
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;
        let (status, expires_at) = match row {
            Some((status, expires_at)) => (
                DraftStatus::try_from(status).map_err(|e| SportsHubError::InvalidInput(e.to_string()))?,
                expires_at,
            ),
            None => return Err(SportsHubError::not_found("pending event", token)),
        };
        if status != DraftStatus::Promoting {
            return Err(not_pending(token, status));
        }

        if expires_at <= now {
            sqlx::query("UPDATE pending_events SET status = $2 WHERE token = $1")
                .bind(token)
                .bind(DraftStatus::Rejected.as_str())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Err(SportsHubError::ExpiredDraft { token: token.to_string() });
        }

        let event = insert_event(&mut tx, request).await?;

        sqlx::query("UPDATE pending_events SET status = $2 WHERE token = $1")
            .bind(token)
            .bind(DraftStatus::Confirmed.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn list_drafts(&self, status: DraftStatus) -> Result<Vec<PendingEvent>> {
        let query = format!(
            "SELECT {DRAFT_COLUMNS} FROM pending_events WHERE status = $1 ORDER BY created_at DESC"
        );
        let drafts = sqlx::query_as::<_, PendingEvent>(&query)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(drafts)
    }

    async fn reject_expired_drafts(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE pending_events SET status = $1 WHERE status IN ($2, $3) AND expires_at <= $4"
        )
        .bind(DraftStatus::Rejected.as_str())
        .bind(DraftStatus::Pending.as_str())
        .bind(DraftStatus::Promoting.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
