//! Event administration

use std::sync::Arc;
use crate::database::EventStore;
use crate::middleware::auth::{require, Action, Resource};
use crate::models::{Actor, Event, EventStatus, UpdateEventRequest};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::log_admin_action;

#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
}

impl EventService {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    pub async fn get(&self, actor: &Actor, id: i64) -> Result<Event> {
        require(actor, Action::Read, Resource::Events)?;
        self.events
            .find_event(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("event", id))
    }

    pub async fn list(&self, actor: &Actor, status: Option<EventStatus>) -> Result<Vec<Event>> {
        require(actor, Action::Read, Resource::Events)?;
        self.events.list_events(status).await
    }

    /// Edit an event; a new `capacity_max` shifts the open slots by the same amount
    pub async fn update(&self, actor: &Actor, id: i64, request: UpdateEventRequest) -> Result<Event> {
        require(actor, Action::Update, Resource::Events)?;
        let event = self.events.update_event(id, request).await?;

        if let Some(admin_id) = actor.user_id {
            log_admin_action(admin_id, "update_event", Some(&id.to_string()), None);
        }
        Ok(event)
    }

    /// Delete an event and every enrollment in it
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<()> {
        require(actor, Action::Delete, Resource::Events)?;
        self.events.delete_event(id).await?;

        if let Some(admin_id) = actor.user_id {
            log_admin_action(admin_id, "delete_event", Some(&id.to_string()), None);
        }
        Ok(())
    }
}
