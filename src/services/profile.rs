//! Which user profile fields members may edit themselves

use std::sync::Arc;
use chrono::Utc;
use crate::database::ProfileSettingsStore;
use crate::middleware::auth::{require, Action, Resource};
use crate::models::{Actor, ProfileSettings, UpdateProfileSettingsRequest};
use crate::utils::errors::Result;
use crate::utils::logging::log_admin_action;

#[derive(Clone)]
pub struct ProfileSettingsService {
    store: Arc<dyn ProfileSettingsStore>,
}

impl ProfileSettingsService {
    pub fn new(store: Arc<dyn ProfileSettingsStore>) -> Self {
        Self { store }
    }

    /// The settings row, created with defaults on first access
    pub async fn get(&self) -> Result<ProfileSettings> {
        self.store.get_or_create_settings(ProfileSettings::defaults(Utc::now())).await
    }

    pub async fn update(&self, actor: &Actor, patch: UpdateProfileSettingsRequest) -> Result<ProfileSettings> {
        require(actor, Action::Update, Resource::ProfileSettings)?;
        self.get().await?;

        let updated = self.store.update_settings(patch).await?;
        if let Some(admin_id) = actor.user_id {
            log_admin_action(admin_id, "update_profile_settings", None, None);
        }
        Ok(updated)
    }
}
