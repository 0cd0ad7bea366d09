//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use super::ParseVariantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Inactive,
    Finished,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Inactive => "inactive",
            EventStatus::Finished => "finished",
        }
    }
}

impl TryFrom<String> for EventStatus {
    type Error = ParseVariantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(EventStatus::Active),
            "inactive" => Ok(EventStatus::Inactive),
            "finished" => Ok(EventStatus::Finished),
            _ => Err(ParseVariantError::new("event status", value)),
        }
    }
}

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    Direct,
    Whatsapp,
}

impl EventOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOrigin::Direct => "direct",
            EventOrigin::Whatsapp => "whatsapp",
        }
    }
}

impl TryFrom<String> for EventOrigin {
    type Error = ParseVariantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "direct" => Ok(EventOrigin::Direct),
            "whatsapp" => Ok(EventOrigin::Whatsapp),
            _ => Err(ParseVariantError::new("event origin", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub venue_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weekdays: Vec<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity_max: i32,
    pub capacity_available: i32,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub requirements: String,
    pub image_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    #[sqlx(try_from = "String")]
    pub origin: EventOrigin,
    pub data_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Number of slots currently held by confirmed enrollments
    pub fn slots_taken(&self) -> i32 {
        self.capacity_max - self.capacity_available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub venue_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub weekdays: Vec<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// `capacity_available` starts equal to this
    pub capacity_max: i32,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    #[serde(default)]
    pub requirements: String,
    pub image_url: Option<String>,
    pub origin: EventOrigin,
    pub data_complete: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub venue_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub weekdays: Option<Vec<String>>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity_max: Option<i32>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub requirements: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<EventStatus>,
}

impl UpdateEventRequest {
    /// Apply every provided field to `event`, leaving capacity to the ledger
    pub fn apply_fields(&self, event: &mut Event) {
        if let Some(ref name) = self.name {
            event.name = name.clone();
        }
        if let Some(ref description) = self.description {
            event.description = description.clone();
        }
        if let Some(category_id) = self.category_id {
            event.category_id = category_id;
        }
        if let Some(venue_id) = self.venue_id {
            event.venue_id = venue_id;
        }
        if let Some(start_date) = self.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = end_date;
        }
        if let Some(ref weekdays) = self.weekdays {
            event.weekdays = weekdays.clone();
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            event.end_time = end_time;
        }
        if let Some(min_age) = self.min_age {
            event.min_age = Some(min_age);
        }
        if let Some(max_age) = self.max_age {
            event.max_age = Some(max_age);
        }
        if let Some(ref requirements) = self.requirements {
            event.requirements = requirements.clone();
        }
        if let Some(ref image_url) = self.image_url {
            event.image_url = Some(image_url.clone());
        }
        if let Some(status) = self.status {
            event.status = status;
        }
    }
}
