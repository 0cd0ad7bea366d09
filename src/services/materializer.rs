//! Event materializer
//!
//! Turns loosely-typed draft fields into a real event. Category and venue names
//! are resolved against the catalog (created when unknown), missing values fall
//! back to the configured defaults, and an attached image is pushed to object
//! storage. Storage failures never block the event.

use std::sync::Arc;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::config::settings::EventDefaultsConfig;
use crate::database::{CatalogStore, EventStore, PendingEventStore};
use crate::models::pending_event::*;
use crate::models::{
    Category, Completeness, CreateCategoryRequest, CreateEventRequest, CreateVenueRequest, Event,
    EventOrigin, PendingEvent, Venue,
};
use crate::services::storage::ObjectStorage;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::parse_local_date;
use crate::utils::logging::log_collaborator_failure;

pub const UNNAMED_EVENT: &str = "Evento sin nombre";
const AUTO_CATEGORY_DESCRIPTION: &str = "Categoria creada automaticamente";

/// Where an event's image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    None,
    Bytes(Vec<u8>),
    Url(String),
}

impl ImageSource {
    /// Pick the image out of raw automation fields; inline data wins over a URL
    pub fn from_fields(fields: &DraftFields) -> Self {
        if let Some(bytes) = fields
            .get(FIELD_IMAGE_BASE64)
            .and_then(Value::as_str)
            .and_then(decode_image_payload)
        {
            return ImageSource::Bytes(bytes);
        }
        match text_field(fields, FIELD_IMAGE_URL) {
            Some(url) => ImageSource::Url(url),
            None => ImageSource::None,
        }
    }
}

/// Draft fields reduced to typed values, before catalog resolution
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFields {
    pub name: String,
    pub description: String,
    pub category_name: Option<String>,
    pub venue_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub weekdays: Vec<String>,
    pub capacity: i32,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub requirements: String,
}

impl NormalizedFields {
    pub fn from_draft(fields: &DraftFields, defaults: &EventDefaultsConfig, today: NaiveDate) -> Result<Self> {
        let start_date = match text_field(fields, FIELD_START_DATE) {
            Some(raw) => parse_date(FIELD_START_DATE, &raw)?,
            None => today,
        };
        let end_date = match text_field(fields, FIELD_END_DATE) {
            Some(raw) => parse_date(FIELD_END_DATE, &raw)?,
            None => start_date,
        };

        let start_time = parse_time(
            FIELD_START_TIME,
            &text_field(fields, FIELD_START_TIME).unwrap_or_else(|| defaults.default_start_time.clone()),
        )?;
        let end_time = parse_time(
            FIELD_END_TIME,
            &text_field(fields, FIELD_END_TIME).unwrap_or_else(|| defaults.default_end_time.clone()),
        )?;

        let capacity = match int_field(fields, FIELD_CAPACITY) {
            None | Some(0) => defaults.default_capacity,
            Some(n) if n < 0 || n > i32::MAX as i64 => {
                return Err(SportsHubError::InvalidInput(format!("capacity out of range: {}", n)));
            }
            Some(n) => n as i32,
        };

        Ok(Self {
            name: text_field(fields, FIELD_NAME).unwrap_or_else(|| UNNAMED_EVENT.to_string()),
            description: text_field(fields, FIELD_DESCRIPTION).unwrap_or_default(),
            category_name: text_field(fields, FIELD_CATEGORY_NAME),
            venue_name: text_field(fields, FIELD_VENUE_NAME),
            start_date,
            end_date,
            start_time,
            end_time,
            weekdays: parse_weekdays(fields.get(FIELD_WEEKDAYS)),
            capacity,
            min_age: optional_age(fields, FIELD_MIN_AGE),
            max_age: optional_age(fields, FIELD_MAX_AGE),
            requirements: text_field(fields, FIELD_REQUIREMENTS).unwrap_or_default(),
        })
    }
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_local_date(raw))
        .ok_or_else(|| SportsHubError::InvalidInput(format!("{}: unrecognized date '{}'", field, raw)))
}

fn parse_time(field: &str, raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| SportsHubError::InvalidInput(format!("{}: unrecognized time '{}'", field, raw)))
}

/// A list stays a list; a string is read as a JSON list, else taken as one entry
pub fn parse_weekdays(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Null | Value::String(_) => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Array(_)) => parse_weekdays(Some(&parsed)),
                _ => vec![s.trim().to_string()],
            }
        }
        _ => Vec::new(),
    }
}

fn optional_age(fields: &DraftFields, key: &str) -> Option<i32> {
    int_field(fields, key)
        .filter(|age| *age > 0)
        .and_then(|age| i32::try_from(age).ok())
}

/// Decode an inline image, tolerating a `data:<mime>;base64,` prefix
pub fn decode_image_payload(raw: &str) -> Option<Vec<u8>> {
    let encoded = match raw.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => raw,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    STANDARD.decode(compact).ok().filter(|bytes| !bytes.is_empty())
}

#[derive(Clone)]
pub struct EventMaterializer {
    catalog: Arc<dyn CatalogStore>,
    events: Arc<dyn EventStore>,
    drafts: Arc<dyn PendingEventStore>,
    storage: Arc<dyn ObjectStorage>,
    defaults: EventDefaultsConfig,
}

impl EventMaterializer {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        events: Arc<dyn EventStore>,
        drafts: Arc<dyn PendingEventStore>,
        storage: Arc<dyn ObjectStorage>,
        defaults: EventDefaultsConfig,
    ) -> Self {
        Self {
            catalog,
            events,
            drafts,
            storage,
            defaults,
        }
    }

    /// Case-insensitive substring match, creating the category when nothing matches
    pub async fn resolve_category(&self, name: Option<&str>) -> Result<Category> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.defaults.default_category);

        if let Some(category) = self.catalog.find_category_matching(name).await? {
            debug!(requested = name, resolved = %category.name, "Category matched");
            return Ok(category);
        }

        let category = self
            .catalog
            .create_category(CreateCategoryRequest {
                name: name.to_string(),
                description: AUTO_CATEGORY_DESCRIPTION.to_string(),
            })
            .await?;
        info!(category_id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Same rule as categories; new venues get the placeholder address
    pub async fn resolve_venue(&self, name: Option<&str>) -> Result<Venue> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.defaults.default_venue);

        if let Some(venue) = self.catalog.find_venue_matching(name).await? {
            debug!(requested = name, resolved = %venue.name, "Venue matched");
            return Ok(venue);
        }

        let venue = self
            .catalog
            .create_venue(CreateVenueRequest {
                name: name.to_string(),
                address: self.defaults.placeholder_venue_address.clone(),
                contact_phone: None,
            })
            .await?;
        info!(venue_id = venue.id, name = %venue.name, "Venue created");
        Ok(venue)
    }

    /// Upload the image if there is one. Any failure yields no image.
    pub async fn upload_image(&self, image: ImageSource, name: &str) -> Option<String> {
        let uploaded = match image {
            ImageSource::None => return None,
            ImageSource::Bytes(bytes) => self.storage.store(&bytes, name).await,
            ImageSource::Url(url) => self.storage.store_from_url(&url).await,
        };

        match uploaded {
            Ok(url) => Some(url),
            Err(e) => {
                log_collaborator_failure("storage", &e.to_string(), Some(name));
                None
            }
        }
    }

    /// Normalize fields, resolve the catalog and upload the image
    pub async fn build_request(
        &self,
        fields: &DraftFields,
        image: ImageSource,
        image_name: &str,
        origin: EventOrigin,
    ) -> Result<CreateEventRequest> {
        let normalized = NormalizedFields::from_draft(fields, &self.defaults, Utc::now().date_naive())?;
        let category = self.resolve_category(normalized.category_name.as_deref()).await?;
        let venue = self.resolve_venue(normalized.venue_name.as_deref()).await?;
        let image_url = self.upload_image(image, image_name).await;

        Ok(CreateEventRequest {
            name: normalized.name,
            description: normalized.description,
            category_id: category.id,
            venue_id: venue.id,
            start_date: normalized.start_date,
            end_date: normalized.end_date,
            weekdays: normalized.weekdays,
            start_time: normalized.start_time,
            end_time: normalized.end_time,
            capacity_max: normalized.capacity,
            min_age: normalized.min_age,
            max_age: normalized.max_age,
            requirements: normalized.requirements,
            image_url,
            origin,
            data_complete: Completeness::assess(fields).data_complete,
        })
    }

    /// Claim the draft, prepare its event and confirm it.
    ///
    /// Only the caller holding the claim uploads the image or touches the
    /// catalog. Expiry is checked again when the event is written.
    pub async fn materialize_draft(&self, token: &str) -> Result<Event> {
        let draft = self.drafts.claim_draft(token, Utc::now()).await?;

        match self.promote_claimed(&draft).await {
            Ok(event) => {
                info!(token = token, event_id = event.id, name = %event.name, "Draft materialized");
                Ok(event)
            }
            Err(e) => {
                if let Err(release_error) = self.drafts.release_draft(token).await {
                    warn!(token = token, error = %release_error, "Failed to release draft claim");
                }
                Err(e)
            }
        }
    }

    async fn promote_claimed(&self, draft: &PendingEvent) -> Result<Event> {
        let image = match draft.image_payload.clone() {
            Some(bytes) => ImageSource::Bytes(bytes),
            None => ImageSource::from_fields(draft.fields()),
        };
        let request = self
            .build_request(draft.fields(), image, &format!("evento_{}", draft.token), EventOrigin::Whatsapp)
            .await?;

        self.drafts.promote_draft(&draft.token, request, Utc::now()).await
    }

    /// Create an event straight from field values, without a draft
    pub async fn create(&self, fields: &DraftFields, origin: EventOrigin) -> Result<Event> {
        let image = ImageSource::from_fields(fields);
        if image == ImageSource::None && fields.contains_key(FIELD_IMAGE_BASE64) {
            warn!("Inline image could not be decoded, creating event without it");
        }

        let image_name = format!("evento_{}", Utc::now().timestamp_millis());
        let request = self.build_request(fields, image, &image_name, origin).await?;
        let event = self.events.create_event(request).await?;
        info!(event_id = event.id, origin = origin.as_str(), "Event created");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;

    fn fields(value: Value) -> DraftFields {
        value.as_object().cloned().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_values() {
        let defaults = Settings::default().events;
        let normalized = NormalizedFields::from_draft(&fields(json!({})), &defaults, today()).unwrap();

        assert_eq!(normalized.name, UNNAMED_EVENT);
        assert_eq!(normalized.start_date, today());
        assert_eq!(normalized.end_date, today());
        assert_eq!(normalized.start_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(normalized.end_time, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(normalized.capacity, 50);
        assert!(normalized.weekdays.is_empty());
        assert_eq!(normalized.min_age, None);
    }

    #[test]
    fn test_end_date_follows_start_date() {
        let defaults = Settings::default().events;
        let normalized = NormalizedFields::from_draft(
            &fields(json!({"fecha_inicio": "2026-11-03", "hora_inicio": "18:30:00", "cupo_maximo": "30"})),
            &defaults,
            today(),
        )
        .unwrap();

        let start = NaiveDate::from_ymd_opt(2026, 11, 3).unwrap();
        assert_eq!(normalized.start_date, start);
        assert_eq!(normalized.end_date, start);
        assert_eq!(normalized.start_time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(normalized.capacity, 30);
    }

    #[test]
    fn test_local_date_format_is_accepted() {
        let defaults = Settings::default().events;
        let normalized =
            NormalizedFields::from_draft(&fields(json!({"fecha_inicio": "03/11/2026"})), &defaults, today()).unwrap();
        assert_eq!(normalized.start_date, NaiveDate::from_ymd_opt(2026, 11, 3).unwrap());
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let defaults = Settings::default().events;
        assert!(NormalizedFields::from_draft(&fields(json!({"fecha_inicio": "mañana"})), &defaults, today()).is_err());
        assert!(NormalizedFields::from_draft(&fields(json!({"hora_fin": "5pm"})), &defaults, today()).is_err());
        assert!(NormalizedFields::from_draft(&fields(json!({"cupo_maximo": -4})), &defaults, today()).is_err());
    }

    #[test]
    fn test_weekdays_shapes() {
        assert_eq!(parse_weekdays(Some(&json!(["lunes", "miercoles"]))), vec!["lunes", "miercoles"]);
        assert_eq!(parse_weekdays(Some(&json!("[\"martes\", \"jueves\"]"))), vec!["martes", "jueves"]);
        assert_eq!(parse_weekdays(Some(&json!("sabado"))), vec!["sabado"]);
        assert!(parse_weekdays(Some(&json!(""))).is_empty());
        assert!(parse_weekdays(None).is_empty());
    }

    #[test]
    fn test_decode_image_payload() {
        let encoded = STANDARD.encode(b"\x89PNG-bytes");
        assert_eq!(decode_image_payload(&encoded).unwrap(), b"\x89PNG-bytes");
        assert_eq!(
            decode_image_payload(&format!("data:image/png;base64,{}", encoded)).unwrap(),
            b"\x89PNG-bytes"
        );
        assert_eq!(decode_image_payload("not base64!"), None);
        assert_eq!(decode_image_payload(""), None);
    }

    #[test]
    fn test_image_source_prefers_inline_bytes() {
        let encoded = STANDARD.encode(b"jpeg");
        let source = ImageSource::from_fields(&fields(json!({
            "imagen_base64": encoded,
            "imagen_url": "https://example.com/a.jpg"
        })));
        assert_eq!(source, ImageSource::Bytes(b"jpeg".to_vec()));

        let source = ImageSource::from_fields(&fields(json!({"imagen_url": "https://example.com/a.jpg"})));
        assert_eq!(source, ImageSource::Url("https://example.com/a.jpg".to_string()));
    }
}
