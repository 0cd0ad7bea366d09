//! Authorization code gate
//!
//! Administrators issue short-lived codes that the automation engine presents
//! to edit, confirm or reject drafts. Validation never consumes a code.

use std::sync::Arc;
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use crate::config::settings::AccessCodeConfig;
use crate::database::AccessCodeStore;
use crate::middleware::auth::{require, Action, Resource};
use crate::models::{Actor, AuthorizationCode, IssuedCode, NewAuthorizationCode};
use crate::utils::errors::{AuthCodeRejection, Result, SportsHubError};
use crate::utils::helpers::generate_access_code;
use crate::utils::logging::log_admin_action;

/// Attempts before giving up on finding an unused code
const MAX_ISSUE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct AccessCodeService {
    store: Arc<dyn AccessCodeStore>,
    config: AccessCodeConfig,
}

impl AccessCodeService {
    pub fn new(store: Arc<dyn AccessCodeStore>, config: AccessCodeConfig) -> Self {
        Self { store, config }
    }

    /// Replace the administrator's active code with a fresh one
    pub async fn issue(&self, actor: &Actor) -> Result<IssuedCode> {
        require(actor, Action::Create, Resource::AccessCodes)?;
        let admin_id = actor
            .user_id
            .ok_or_else(|| SportsHubError::Authentication("admin session has no user id".to_string()))?;

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let now = Utc::now();
            let candidate = NewAuthorizationCode {
                code: generate_access_code(self.config.length),
                admin_id,
                created_at: now,
                expires_at: now + Duration::days(self.config.ttl_days),
            };

            if let Some(code) = self.store.replace_active_code(candidate).await? {
                log_admin_action(admin_id, "issue_access_code", None, None);
                info!(admin_id = admin_id, expires_at = %code.expires_at, "Access code issued");
                return Ok(IssuedCode {
                    remaining: code.remaining(now).unwrap_or_default(),
                    code: code.code,
                    expires_at: code.expires_at,
                });
            }

            debug!(admin_id = admin_id, attempt = attempt, "Retrying access code generation");
        }

        Err(SportsHubError::InvalidInput("could not generate a unique access code".to_string()))
    }

    /// Check a presented code, recording the caller's phone when known
    pub async fn validate(&self, code: &str, phone: Option<&str>) -> Result<AuthorizationCode> {
        let code = code.trim();
        let now = Utc::now();

        let found = if code.is_empty() {
            None
        } else {
            self.store.find_active_code(code).await?
        };

        let found = match found {
            Some(found) => found,
            None => {
                warn!(reason = %AuthCodeRejection::NotFound, "Access code rejected");
                return Err(SportsHubError::InvalidAuthCode { reason: AuthCodeRejection::NotFound });
            }
        };

        if !found.is_vigent(now) {
            warn!(admin_id = found.admin_id, reason = %AuthCodeRejection::Expired, "Access code rejected");
            return Err(SportsHubError::InvalidAuthCode { reason: AuthCodeRejection::Expired });
        }

        let phone = phone.map(str::trim).filter(|p| !p.is_empty());
        self.store.record_code_use(found.id, phone, now).await?;
        debug!(admin_id = found.admin_id, phone_bound = phone.is_some(), "Access code accepted");

        Ok(AuthorizationCode {
            phone: phone.map(str::to_string).or(found.phone),
            last_used_at: Some(now),
            ..found
        })
    }

    /// The administrator's active code, if it has not expired
    pub async fn current(&self, actor: &Actor) -> Result<Option<AuthorizationCode>> {
        require(actor, Action::Read, Resource::AccessCodes)?;
        let admin_id = match actor.user_id {
            Some(id) => id,
            None => return Ok(None),
        };

        let code = self.store.active_code_for_admin(admin_id).await?;
        Ok(code.filter(|code| code.is_vigent(Utc::now())))
    }

    /// Whether some vigent code has been used from this phone
    pub async fn is_phone_authorized(&self, phone: &str) -> Result<bool> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Ok(false);
        }

        let code = self.store.find_vigent_code_for_phone(phone, Utc::now()).await?;
        Ok(code.is_some())
    }
}
