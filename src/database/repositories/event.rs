//! Event repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use crate::database::store::EventStore;
use crate::models::event::{Event, EventStatus, CreateEventRequest, UpdateEventRequest};
use crate::services::ledger::{self, Capacity};
use crate::utils::errors::{Result, SportsHubError};

/// Column list for `events` queries
pub(crate) const EVENT_COLUMNS: &str = "\
    id, name, description, category_id, venue_id, start_date, end_date, weekdays, \
    start_time, end_time, capacity_max, capacity_available, min_age, max_age, \
    requirements, image_url, status, origin, data_complete, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lock the event row and read its counters
pub(crate) async fn lock_capacity(tx: &mut Transaction<'_, Postgres>, event_id: i64) -> Result<Capacity> {
    let row: Option<(i32, i32)> = sqlx::query_as(
        "SELECT capacity_max, capacity_available FROM events WHERE id = $1 FOR UPDATE"
    )
    .bind(event_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|(max, available)| Capacity { max, available })
        .ok_or_else(|| SportsHubError::not_found("event", event_id))
}

pub(crate) async fn store_capacity(tx: &mut Transaction<'_, Postgres>, event_id: i64, capacity: Capacity) -> Result<()> {
    sqlx::query(
        "UPDATE events SET capacity_max = $2, capacity_available = $3, updated_at = $4 WHERE id = $1"
    )
    .bind(event_id)
    .bind(capacity.max)
    .bind(capacity.available)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Insert an event inside an open transaction
pub(crate) async fn insert_event(tx: &mut Transaction<'_, Postgres>, request: CreateEventRequest) -> Result<Event> {
    let now = Utc::now();
    let query = format!(
        "INSERT INTO events (name, description, category_id, venue_id, start_date, end_date, weekdays, \
         start_time, end_time, capacity_max, capacity_available, min_age, max_age, requirements, \
         image_url, status, origin, data_complete, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18) \
         RETURNING {EVENT_COLUMNS}"
    );

    let event = sqlx::query_as::<_, Event>(&query)
        .bind(request.name)
        .bind(request.description)
        .bind(request.category_id)
        .bind(request.venue_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.weekdays)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.capacity_max)
        .bind(request.min_age)
        .bind(request.max_age)
        .bind(request.requirements)
        .bind(request.image_url)
        .bind(EventStatus::Active.as_str())
        .bind(request.origin.as_str())
        .bind(request.data_complete)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

    Ok(event)
}

#[async_trait]
impl EventStore for EventRepository {
    async fn create_event(&self, request: CreateEventRequest) -> Result<Event> {
        let mut tx = self.pool.begin().await?;
        let event = insert_event(&mut tx, request).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    async fn update_event(&self, id: i64, request: UpdateEventRequest) -> Result<Event> {
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
        let mut event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| SportsHubError::not_found("event", id))?;

        let mut capacity = Capacity {
            max: event.capacity_max,
            available: event.capacity_available,
        };
        if let Some(new_max) = request.capacity_max {
            ledger::resize(id, &mut capacity, new_max)?;
        }
        request.apply_fields(&mut event);

        let query = format!(
            "UPDATE events \
             SET name = $2, description = $3, category_id = $4, venue_id = $5, start_date = $6, \
                 end_date = $7, weekdays = $8, start_time = $9, end_time = $10, capacity_max = $11, \
                 capacity_available = $12, min_age = $13, max_age = $14, requirements = $15, \
                 image_url = $16, status = $17, updated_at = $18 \
             WHERE id = $1 \
             RETURNING {EVENT_COLUMNS}"
        );
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(event.name)
            .bind(event.description)
            .bind(event.category_id)
            .bind(event.venue_id)
            .bind(event.start_date)
            .bind(event.end_date)
            .bind(event.weekdays)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(capacity.max)
            .bind(capacity.available)
            .bind(event.min_age)
            .bind(event.max_age)
            .bind(event.requirements)
            .bind(event.image_url)
            .bind(event.status.as_str())
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn delete_event(&self, id: i64) -> Result<()> {
        // enrollments go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("event", id));
        }
        Ok(())
    }

    async fn list_events(&self, status: Option<EventStatus>) -> Result<Vec<Event>> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY start_date ASC, id ASC"
        );
        let events = sqlx::query_as::<_, Event>(&query)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }
}
