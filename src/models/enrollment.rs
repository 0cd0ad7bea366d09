//! Enrollment model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::ParseVariantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Confirmed => "confirmed",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, EnrollmentStatus::Confirmed)
    }
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        EnrollmentStatus::Pending
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = ParseVariantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(EnrollmentStatus::Pending),
            "confirmed" => Ok(EnrollmentStatus::Confirmed),
            "cancelled" => Ok(EnrollmentStatus::Cancelled),
            _ => Err(ParseVariantError::new("enrollment status", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    #[sqlx(try_from = "String")]
    pub status: EnrollmentStatus,
    pub attended: bool,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnrollmentRequest {
    pub user_id: i64,
    pub event_id: i64,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEnrollmentRequest {
    pub status: Option<EnrollmentStatus>,
    pub attended: Option<bool>,
    pub comment: Option<String>,
}

impl UpdateEnrollmentRequest {
    pub fn status(status: EnrollmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
