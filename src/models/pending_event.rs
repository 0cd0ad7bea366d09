//! Pending event (draft) model
//!
//! Drafts arrive from the WhatsApp automation flow as loosely-typed field maps.
//! Wire keys are kept exactly as the automation engine sends them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow};
use super::ParseVariantError;

/// Free-form draft fields keyed by wire name
pub type DraftFields = Map<String, Value>;

pub const FIELD_NAME: &str = "nombre";
pub const FIELD_DESCRIPTION: &str = "descripcion";
pub const FIELD_CATEGORY_NAME: &str = "categoria_nombre";
pub const FIELD_VENUE_NAME: &str = "ubicacion_nombre";
pub const FIELD_START_DATE: &str = "fecha_inicio";
pub const FIELD_END_DATE: &str = "fecha_fin";
pub const FIELD_START_TIME: &str = "hora_inicio";
pub const FIELD_END_TIME: &str = "hora_fin";
pub const FIELD_WEEKDAYS: &str = "dias_semana";
pub const FIELD_CAPACITY: &str = "cupo_maximo";
pub const FIELD_MIN_AGE: &str = "edad_minima";
pub const FIELD_MAX_AGE: &str = "edad_maxima";
pub const FIELD_REQUIREMENTS: &str = "requisitos";
pub const FIELD_IMAGE_BASE64: &str = "imagen_base64";
pub const FIELD_IMAGE_URL: &str = "imagen_url";

/// Fields an authorized edit may change; anything else is ignored
pub const EDITABLE_FIELDS: [&str; 10] = [
    FIELD_NAME,
    FIELD_DESCRIPTION,
    FIELD_CATEGORY_NAME,
    FIELD_VENUE_NAME,
    FIELD_START_DATE,
    FIELD_END_DATE,
    FIELD_START_TIME,
    FIELD_END_TIME,
    FIELD_WEEKDAYS,
    FIELD_CAPACITY,
];

/// Fields whose absence marks a submission as incomplete
pub const REQUIRED_FIELDS: [&str; 3] = [FIELD_NAME, FIELD_DESCRIPTION, FIELD_START_DATE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    /// Claimed by one confirmation while its image and catalog rows are prepared
    Promoting,
    Confirmed,
    Rejected,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Pending => "pending",
            DraftStatus::Promoting => "promoting",
            DraftStatus::Confirmed => "confirmed",
            DraftStatus::Rejected => "rejected",
        }
    }
}

impl TryFrom<String> for DraftStatus {
    type Error = ParseVariantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(DraftStatus::Pending),
            "promoting" => Ok(DraftStatus::Promoting),
            "confirmed" => Ok(DraftStatus::Confirmed),
            "rejected" => Ok(DraftStatus::Rejected),
            _ => Err(ParseVariantError::new("draft status", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingEvent {
    pub id: i64,
    pub token: String,
    pub draft_fields: Json<DraftFields>,
    #[serde(skip)]
    pub image_payload: Option<Vec<u8>>,
    #[sqlx(try_from = "String")]
    pub status: DraftStatus,
    pub data_complete: bool,
    pub missing_fields: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingEvent {
    pub fn fields(&self) -> &DraftFields {
        &self.draft_fields.0
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn has_image(&self) -> bool {
        self.image_payload.is_some()
    }
}

/// Data needed to store a new draft
#[derive(Debug, Clone)]
pub struct NewPendingEvent {
    pub token: String,
    pub draft_fields: DraftFields,
    pub image_payload: Option<Vec<u8>>,
    pub completeness: Completeness,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Advisory record of which required fields were present at submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    #[serde(rename = "datos_completos")]
    pub data_complete: bool,
    #[serde(rename = "campos_faltantes")]
    pub missing_fields: Vec<String>,
}

impl Completeness {
    pub fn assess(fields: &DraftFields) -> Self {
        let missing_fields: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|key| !has_value(fields, key))
            .map(|key| key.to_string())
            .collect();

        Self {
            data_complete: missing_fields.is_empty(),
            missing_fields,
        }
    }
}

/// Whether `key` is present with a non-null, non-blank value
pub fn has_value(fields: &DraftFields, key: &str) -> bool {
    match fields.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Read a trimmed, non-empty string field
pub fn text_field(fields: &DraftFields, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Read an integer field, accepting numbers and numeric strings
pub fn int_field(fields: &DraftFields, key: &str) -> Option<i64> {
    match fields.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
