//! Pending-event workflow
//!
//! The WhatsApp automation engine submits drafts and then edits, confirms or
//! rejects them on an administrator's behalf by presenting an access code.
//! Every engine call is gated on the shared API key; see [`AutomationSession`].
//! Administrators can work the same queue from their own session.

use std::sync::Arc;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::config::settings::AutomationConfig;
use crate::database::PendingEventStore;
use crate::middleware::auth::{require, Action, ApiKeyGuard, Resource};
use crate::models::pending_event::{FIELD_IMAGE_BASE64, EDITABLE_FIELDS};
use crate::models::{
    Actor, Completeness, DraftFields, DraftStatus, Event, EventOrigin, NewPendingEvent, PendingEvent,
};
use crate::services::access_code::AccessCodeService;
use crate::services::materializer::{decode_image_payload, EventMaterializer};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::generate_draft_token;
use crate::utils::logging::{log_admin_action, log_automation_action};

/// Returned to the engine after a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub token: String,
    pub fields: DraftFields,
    #[serde(flatten)]
    pub completeness: Completeness,
    pub editable_fields: Vec<String>,
    pub expires_at: chrono::DateTime<Utc>,
}

/// A draft as listed to administrators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSummary {
    #[serde(flatten)]
    pub draft: PendingEvent,
    pub expired: bool,
    pub has_image: bool,
}

/// Unwrap an `output` envelope and require a JSON object
fn payload_fields(payload: Value) -> Result<DraftFields> {
    let payload = match payload {
        Value::Object(mut map) if matches!(map.get("output"), Some(Value::Object(_))) => {
            map.remove("output").unwrap_or(Value::Null)
        }
        other => other,
    };

    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(SportsHubError::InvalidInput("payload must be a JSON object".to_string())),
    }
}

/// Copy allow-listed keys from `updates` into `fields`, returning the keys applied
fn apply_allowed(fields: &mut DraftFields, updates: &DraftFields) -> Vec<&'static str> {
    let mut applied = Vec::new();
    for key in EDITABLE_FIELDS {
        if let Some(value) = updates.get(key) {
            fields.insert(key.to_string(), value.clone());
            applied.push(key);
        }
    }
    applied
}

#[derive(Clone)]
pub struct PendingEventService {
    drafts: Arc<dyn PendingEventStore>,
    codes: AccessCodeService,
    materializer: EventMaterializer,
    guard: ApiKeyGuard,
    config: AutomationConfig,
}

impl PendingEventService {
    pub fn new(
        drafts: Arc<dyn PendingEventStore>,
        codes: AccessCodeService,
        materializer: EventMaterializer,
        config: AutomationConfig,
    ) -> Self {
        Self {
            drafts,
            codes,
            materializer,
            guard: ApiKeyGuard::new(config.api_key.clone()),
            config,
        }
    }

    /// Authenticate an automation engine request by its `X-API-Key` header
    pub fn automation(&self, api_key: Option<&str>) -> Result<AutomationSession<'_>> {
        self.guard.verify(api_key)?;
        Ok(AutomationSession {
            service: self,
            phone: None,
        })
    }

    /// Load a draft that may still change. An expired one is rejected on the spot.
    async fn load_open(&self, token: &str) -> Result<PendingEvent> {
        let draft = self
            .drafts
            .find_draft(token)
            .await?
            .ok_or_else(|| SportsHubError::not_found("pending event", token))?;

        if draft.status != DraftStatus::Pending {
            return Err(SportsHubError::DraftNotPending {
                token: token.to_string(),
                status: draft.status.as_str().to_string(),
            });
        }

        let now = Utc::now();
        if draft.is_expired(now) {
            if self.drafts.expire_draft(token, now).await? {
                warn!(token = token, expires_at = %draft.expires_at, "Draft expired, rejected");
            }
            return Err(SportsHubError::ExpiredDraft { token: token.to_string() });
        }

        Ok(draft)
    }

    async fn apply_edits(&self, draft: PendingEvent, updates: &DraftFields) -> Result<PendingEvent> {
        let mut fields = draft.draft_fields.0.clone();
        let applied = apply_allowed(&mut fields, updates);
        if applied.is_empty() {
            debug!(token = %draft.token, "No editable fields in update");
            return Ok(draft);
        }

        let completeness = Completeness::assess(&fields);
        let updated = self.drafts.update_draft_fields(&draft.token, fields, completeness).await?;
        debug!(token = %draft.token, fields = ?applied, "Draft edited");
        Ok(updated)
    }

    /// Pending drafts with their expiry flag
    pub async fn list_pending(&self, actor: &Actor) -> Result<Vec<DraftSummary>> {
        require(actor, Action::Read, Resource::PendingEvents)?;
        let now = Utc::now();

        let drafts = self.drafts.list_drafts(DraftStatus::Pending).await?;
        Ok(drafts
            .into_iter()
            .map(|draft| DraftSummary {
                expired: draft.is_expired(now),
                has_image: draft.has_image(),
                draft,
            })
            .collect())
    }

    /// Approve from an admin session, applying any allow-listed edits first
    pub async fn admin_approve(&self, actor: &Actor, token: &str, edits: &DraftFields) -> Result<Event> {
        require(actor, Action::Update, Resource::PendingEvents)?;
        let draft = self.load_open(token).await?;
        self.apply_edits(draft, edits).await?;

        let event = self.materializer.materialize_draft(token).await?;
        if let Some(admin_id) = actor.user_id {
            log_admin_action(admin_id, "approve_draft", Some(token), Some(&event.id.to_string()));
        }
        Ok(event)
    }

    pub async fn admin_reject(&self, actor: &Actor, token: &str) -> Result<PendingEvent> {
        require(actor, Action::Update, Resource::PendingEvents)?;
        let rejected = self.reject_draft(token).await?;

        if let Some(admin_id) = actor.user_id {
            log_admin_action(admin_id, "reject_draft", Some(token), None);
        }
        Ok(rejected)
    }

    /// Create an event from an admin session without going through a draft
    pub async fn create_direct(&self, actor: &Actor, fields: &DraftFields) -> Result<Event> {
        require(actor, Action::Create, Resource::Events)?;
        let event = self.materializer.create(fields, EventOrigin::Direct).await?;

        if let Some(admin_id) = actor.user_id {
            log_admin_action(admin_id, "create_event", Some(&event.id.to_string()), None);
        }
        Ok(event)
    }

    /// Reject every pending draft past its expiry
    pub async fn sweep_expired(&self) -> Result<u64> {
        let swept = self.drafts.reject_expired_drafts(Utc::now()).await?;
        if swept > 0 {
            info!(count = swept, "Expired drafts rejected");
        }
        Ok(swept)
    }

    async fn reject_draft(&self, token: &str) -> Result<PendingEvent> {
        if self.drafts.find_draft(token).await?.is_none() {
            return Err(SportsHubError::not_found("pending event", token));
        }
        self.drafts.set_draft_status(token, DraftStatus::Rejected).await
    }
}

/// Engine requests that passed the API key check
pub struct AutomationSession<'a> {
    service: &'a PendingEventService,
    phone: Option<String>,
}

impl std::fmt::Debug for AutomationSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationSession")
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl AutomationSession<'_> {
    /// Attribute the session to the WhatsApp number relaying the admin's
    /// messages. Codes validated through it get bound to that number.
    pub fn from_phone(mut self, phone: &str) -> Self {
        let phone = phone.trim();
        self.phone = (!phone.is_empty()).then(|| phone.to_string());
        self
    }

    async fn check_code(&self, code: &str) -> Result<()> {
        self.service.codes.validate(code, self.phone.as_deref()).await?;
        Ok(())
    }

    /// Store a new draft and report which required fields are still missing
    pub async fn submit(&self, payload: Value) -> Result<Submission> {
        let mut fields = payload_fields(payload)?;

        let image_payload = match fields.remove(FIELD_IMAGE_BASE64) {
            Some(Value::String(raw)) => {
                let decoded = decode_image_payload(&raw);
                if decoded.is_none() {
                    warn!("Inline image could not be decoded, dropping it");
                }
                decoded
            }
            Some(Value::Null) | None => None,
            Some(_) => {
                warn!("Inline image is not a string, dropping it");
                None
            }
        };

        let now = Utc::now();
        let completeness = Completeness::assess(&fields);
        let draft = self
            .service
            .drafts
            .insert_draft(NewPendingEvent {
                token: generate_draft_token(),
                draft_fields: fields,
                image_payload,
                completeness: completeness.clone(),
                created_at: now,
                expires_at: now + Duration::hours(self.service.config.draft_ttl_hours),
            })
            .await?;

        log_automation_action(&draft.token, "submit", None);
        info!(
            token = %draft.token,
            complete = completeness.data_complete,
            has_image = draft.has_image(),
            "Draft submitted"
        );

        Ok(Submission {
            token: draft.token.clone(),
            fields: draft.draft_fields.0.clone(),
            completeness,
            editable_fields: EDITABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
            expires_at: draft.expires_at,
        })
    }

    /// Change allow-listed fields of a pending draft
    pub async fn edit(&self, token: &str, code: &str, updates: &DraftFields) -> Result<PendingEvent> {
        self.check_code(code).await?;
        let draft = self.service.load_open(token).await?;

        let updated = self.service.apply_edits(draft, updates).await?;
        log_automation_action(token, "edit", None);
        Ok(updated)
    }

    /// Reject a draft whatever its status
    pub async fn reject(&self, token: &str, code: &str) -> Result<PendingEvent> {
        self.check_code(code).await?;
        let rejected = self.service.reject_draft(token).await?;

        log_automation_action(token, "reject", None);
        Ok(rejected)
    }

    /// Turn a pending draft into an event
    pub async fn confirm(&self, token: &str, code: &str) -> Result<Event> {
        self.check_code(code).await?;
        let event = match self.service.materializer.materialize_draft(token).await {
            Err(SportsHubError::ExpiredDraft { token }) => {
                warn!(token = %token, "Draft expired before confirmation, rejected");
                return Err(SportsHubError::ExpiredDraft { token });
            }
            other => other?,
        };
        log_automation_action(token, "confirm", Some(&event.id.to_string()));
        Ok(event)
    }

    /// Create an event in one step, skipping the draft stage
    pub async fn create_from_automation(&self, payload: Value) -> Result<Event> {
        let fields = payload_fields(payload)?;
        self.service.materializer.create(&fields, EventOrigin::Whatsapp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_envelope_is_unwrapped() {
        let fields = payload_fields(json!({"output": {"nombre": "Yoga"}})).unwrap();
        assert_eq!(fields.get("nombre"), Some(&json!("Yoga")));

        let fields = payload_fields(json!({"output": "texto", "nombre": "Yoga"})).unwrap();
        assert_eq!(fields.get("output"), Some(&json!("texto")));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        assert!(payload_fields(json!(["nombre"])).is_err());
    }

    #[test]
    fn test_only_editable_fields_apply() {
        let mut fields = json!({"nombre": "Yoga"}).as_object().cloned().unwrap();
        let updates = json!({"cupo_maximo": 20, "estado": "confirmed", "imagen_url": "x"})
            .as_object()
            .cloned()
            .unwrap();

        let applied = apply_allowed(&mut fields, &updates);
        assert_eq!(applied, vec!["cupo_maximo"]);
        assert_eq!(fields.get("cupo_maximo"), Some(&json!(20)));
        assert!(!fields.contains_key("estado"));
        assert!(!fields.contains_key("imagen_url"));
    }
}
