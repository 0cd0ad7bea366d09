//! Test data builders

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use SportsHub::models::{CreateEventRequest, DraftFields, EventOrigin};

pub fn event_request(capacity: i32) -> CreateEventRequest {
    CreateEventRequest {
        name: "Natación recreativa".to_string(),
        description: "Piscina municipal de El Roble".to_string(),
        category_id: 1,
        venue_id: 1,
        start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
        weekdays: vec!["lunes".to_string(), "miercoles".to_string()],
        start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        capacity_max: capacity,
        min_age: Some(12),
        max_age: None,
        requirements: String::new(),
        image_url: None,
        origin: EventOrigin::Direct,
        data_complete: true,
    }
}

/// JSON object literal as draft fields
pub fn fields(value: Value) -> DraftFields {
    value.as_object().cloned().expect("fields must be a JSON object")
}

/// Smallest PNG header, enough for the MIME sniffing
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
