//! Profile settings repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use crate::database::store::ProfileSettingsStore;
use crate::models::profile::{ProfileSettings, UpdateProfileSettingsRequest, PROFILE_SETTINGS_ID};
use crate::utils::errors::{Result, SportsHubError};

const SETTINGS_COLUMNS: &str = "\
    id, name_editable, first_surname_editable, second_surname_editable, email_editable, \
    phone_editable, birthdate_editable, interests_editable, updated_at";

#[derive(Debug, Clone)]
pub struct ProfileSettingsRepository {
    pool: PgPool,
}

impl ProfileSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileSettingsStore for ProfileSettingsRepository {
    async fn get_or_create_settings(&self, defaults: ProfileSettings) -> Result<ProfileSettings> {
        sqlx::query(
            r#"
            INSERT INTO profile_settings (id, name_editable, first_surname_editable, second_surname_editable,
                email_editable, phone_editable, birthdate_editable, interests_editable, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#
        )
        .bind(PROFILE_SETTINGS_ID)
        .bind(defaults.name_editable)
        .bind(defaults.first_surname_editable)
        .bind(defaults.second_surname_editable)
        .bind(defaults.email_editable)
        .bind(defaults.phone_editable)
        .bind(defaults.birthdate_editable)
        .bind(defaults.interests_editable)
        .bind(defaults.updated_at)
        .execute(&self.pool)
        .await?;

        let query = format!("SELECT {SETTINGS_COLUMNS} FROM profile_settings WHERE id = $1");
        let settings = sqlx::query_as::<_, ProfileSettings>(&query)
            .bind(PROFILE_SETTINGS_ID)
            .fetch_one(&self.pool)
            .await?;

        Ok(settings)
    }

    async fn update_settings(&self, patch: UpdateProfileSettingsRequest) -> Result<ProfileSettings> {
        let query = format!(
            "UPDATE profile_settings \
             SET name_editable = COALESCE($2, name_editable), \
                 first_surname_editable = COALESCE($3, first_surname_editable), \
                 second_surname_editable = COALESCE($4, second_surname_editable), \
                 email_editable = COALESCE($5, email_editable), \
                 phone_editable = COALESCE($6, phone_editable), \
                 birthdate_editable = COALESCE($7, birthdate_editable), \
                 interests_editable = COALESCE($8, interests_editable), \
                 updated_at = $9 \
             WHERE id = $1 \
             RETURNING {SETTINGS_COLUMNS}"
        );
        sqlx::query_as::<_, ProfileSettings>(&query)
            .bind(PROFILE_SETTINGS_ID)
            .bind(patch.name_editable)
            .bind(patch.first_surname_editable)
            .bind(patch.second_surname_editable)
            .bind(patch.email_editable)
            .bind(patch.phone_editable)
            .bind(patch.birthdate_editable)
            .bind(patch.interests_editable)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SportsHubError::not_found("profile settings", PROFILE_SETTINGS_ID))
    }
}
