//! Global profile-editability settings

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Primary key of the single settings row
pub const PROFILE_SETTINGS_ID: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProfileSettings {
    pub id: i32,
    pub name_editable: bool,
    pub first_surname_editable: bool,
    pub second_surname_editable: bool,
    pub email_editable: bool,
    pub phone_editable: bool,
    pub birthdate_editable: bool,
    pub interests_editable: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProfileSettings {
    pub fn defaults(now: DateTime<Utc>) -> Self {
        Self {
            id: PROFILE_SETTINGS_ID,
            name_editable: false,
            first_surname_editable: false,
            second_surname_editable: false,
            email_editable: true,
            phone_editable: true,
            birthdate_editable: false,
            interests_editable: true,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileSettingsRequest {
    pub name_editable: Option<bool>,
    pub first_surname_editable: Option<bool>,
    pub second_surname_editable: Option<bool>,
    pub email_editable: Option<bool>,
    pub phone_editable: Option<bool>,
    pub birthdate_editable: Option<bool>,
    pub interests_editable: Option<bool>,
}

impl UpdateProfileSettingsRequest {
    pub fn apply(&self, settings: &mut ProfileSettings) {
        let pairs = [
            (self.name_editable, &mut settings.name_editable),
            (self.first_surname_editable, &mut settings.first_surname_editable),
            (self.second_surname_editable, &mut settings.second_surname_editable),
            (self.email_editable, &mut settings.email_editable),
            (self.phone_editable, &mut settings.phone_editable),
            (self.birthdate_editable, &mut settings.birthdate_editable),
            (self.interests_editable, &mut settings.interests_editable),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}
