//! In-memory store
//!
//! Implements every storage trait behind a single async mutex, so each call is
//! one atomic step. Used by tests and by local runs without PostgreSQL.

use std::collections::HashMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::Mutex;
use tracing::debug;
use crate::database::store::*;
use crate::models::*;
use crate::services::ledger::{self, Capacity, LedgerEffect};
use crate::utils::errors::{Result, SportsHubError};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    events: HashMap<i64, Event>,
    enrollments: HashMap<i64, Enrollment>,
    categories: Vec<Category>,
    venues: Vec<Venue>,
    drafts: HashMap<String, PendingEvent>,
    access_codes: Vec<AuthorizationCode>,
    verification_codes: Vec<EmailVerificationCode>,
    profile_settings: Option<ProfileSettings>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn event_mut(&mut self, id: i64) -> Result<&mut Event> {
        self.events
            .get_mut(&id)
            .ok_or_else(|| SportsHubError::not_found("event", id))
    }

    fn draft_mut(&mut self, token: &str) -> Result<&mut PendingEvent> {
        self.drafts
            .get_mut(token)
            .ok_or_else(|| SportsHubError::not_found("pending event", token))
    }

    fn insert_event(&mut self, request: CreateEventRequest, now: DateTime<Utc>) -> Event {
        let id = self.next_id();
        let event = Event {
            id,
            name: request.name,
            description: request.description,
            category_id: request.category_id,
            venue_id: request.venue_id,
            start_date: request.start_date,
            end_date: request.end_date,
            weekdays: request.weekdays,
            start_time: request.start_time,
            end_time: request.end_time,
            capacity_max: request.capacity_max,
            capacity_available: request.capacity_max,
            min_age: request.min_age,
            max_age: request.max_age,
            requirements: request.requirements,
            image_url: request.image_url,
            status: EventStatus::Active,
            origin: request.origin,
            data_complete: request.data_complete,
            created_at: now,
            updated_at: now,
        };
        self.events.insert(id, event.clone());
        event
    }

    /// Run the ledger against one event, writing back only on success
    fn adjust_capacity(&mut self, event_id: i64, effect: LedgerEffect) -> Result<()> {
        let event = self.event_mut(event_id)?;
        let mut capacity = Capacity {
            max: event.capacity_max,
            available: event.capacity_available,
        };
        if ledger::apply(event_id, &mut capacity, effect)?.changed() {
            event.capacity_available = capacity.available;
            event.updated_at = Utc::now();
        }
        Ok(())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn not_pending(token: &str, status: DraftStatus) -> SportsHubError {
    SportsHubError::DraftNotPending {
        token: token.to_string(),
        status: status.as_str().to_string(),
    }
}

/// Store holding everything in process memory
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn create_event(&self, request: CreateEventRequest) -> Result<Event> {
        if request.capacity_max < 0 {
            return Err(SportsHubError::InvalidInput("capacity must not be negative".to_string()));
        }
        let mut state = self.state.lock().await;
        Ok(state.insert_event(request, Utc::now()))
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>> {
        let state = self.state.lock().await;
        Ok(state.events.get(&id).cloned())
    }

    async fn update_event(&self, id: i64, request: UpdateEventRequest) -> Result<Event> {
        let mut state = self.state.lock().await;
        let event = state.event_mut(id)?;

        let mut capacity = Capacity {
            max: event.capacity_max,
            available: event.capacity_available,
        };
        if let Some(new_max) = request.capacity_max {
            ledger::resize(id, &mut capacity, new_max)?;
        }

        request.apply_fields(event);
        event.capacity_max = capacity.max;
        event.capacity_available = capacity.available;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.events.remove(&id).is_none() {
            return Err(SportsHubError::not_found("event", id));
        }
        state.enrollments.retain(|_, enrollment| enrollment.event_id != id);
        Ok(())
    }

    async fn list_events(&self, status: Option<EventStatus>) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|event| status.map_or(true, |s| event.status == s))
            .cloned()
            .collect();
        events.sort_by_key(|event| (event.start_date, event.id));
        Ok(events)
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    async fn create_enrollment(&self, request: CreateEnrollmentRequest) -> Result<Enrollment> {
        let mut state = self.state.lock().await;
        state.adjust_capacity(request.event_id, LedgerEffect::plan(None, Some(request.status)))?;

        let id = state.next_id();
        let enrollment = Enrollment {
            id,
            user_id: request.user_id,
            event_id: request.event_id,
            status: request.status,
            attended: false,
            comment: request.comment,
            created_at: Utc::now(),
        };
        state.enrollments.insert(id, enrollment.clone());
        Ok(enrollment)
    }

    async fn find_enrollment(&self, id: i64) -> Result<Option<Enrollment>> {
        let state = self.state.lock().await;
        Ok(state.enrollments.get(&id).cloned())
    }

    async fn update_enrollment(&self, id: i64, request: UpdateEnrollmentRequest) -> Result<Enrollment> {
        let mut state = self.state.lock().await;
        let current = state
            .enrollments
            .get(&id)
            .cloned()
            .ok_or_else(|| SportsHubError::not_found("enrollment", id))?;

        if let Some(status) = request.status {
            let effect = LedgerEffect::plan(Some(current.status), Some(status));
            state.adjust_capacity(current.event_id, effect)?;
        }

        let enrollment = state
            .enrollments
            .get_mut(&id)
            .ok_or_else(|| SportsHubError::not_found("enrollment", id))?;
        if let Some(status) = request.status {
            enrollment.status = status;
        }
        if let Some(attended) = request.attended {
            enrollment.attended = attended;
        }
        if let Some(comment) = request.comment {
            enrollment.comment = comment;
        }
        Ok(enrollment.clone())
    }

    async fn delete_enrollment(&self, id: i64) -> Result<Enrollment> {
        let mut state = self.state.lock().await;
        let current = state
            .enrollments
            .get(&id)
            .cloned()
            .ok_or_else(|| SportsHubError::not_found("enrollment", id))?;

        state.adjust_capacity(current.event_id, LedgerEffect::plan(Some(current.status), None))?;
        state.enrollments.remove(&id);
        Ok(current)
    }

    async fn list_event_enrollments(&self, event_id: i64) -> Result<Vec<Enrollment>> {
        let state = self.state.lock().await;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|enrollment| enrollment.event_id == event_id)
            .cloned()
            .collect();
        enrollments.sort_by_key(|enrollment| enrollment.id);
        Ok(enrollments)
    }

    async fn list_user_enrollments(&self, user_id: i64) -> Result<Vec<Enrollment>> {
        let state = self.state.lock().await;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|enrollment| enrollment.user_id == user_id)
            .cloned()
            .collect();
        enrollments.sort_by_key(|enrollment| enrollment.id);
        Ok(enrollments)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_category_matching(&self, fragment: &str) -> Result<Option<Category>> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .find(|category| contains_ignore_case(&category.name, fragment))
            .cloned())
    }

    async fn create_category(&self, request: CreateCategoryRequest) -> Result<Category> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .categories
            .iter()
            .find(|category| category.name.to_lowercase() == request.name.to_lowercase())
        {
            return Ok(existing.clone());
        }

        let category = Category {
            id: state.next_id(),
            name: request.name,
            description: request.description,
            active: true,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn find_venue_matching(&self, fragment: &str) -> Result<Option<Venue>> {
        let state = self.state.lock().await;
        Ok(state
            .venues
            .iter()
            .find(|venue| contains_ignore_case(&venue.name, fragment))
            .cloned())
    }

    async fn create_venue(&self, request: CreateVenueRequest) -> Result<Venue> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .venues
            .iter()
            .find(|venue| venue.name.to_lowercase() == request.name.to_lowercase())
        {
            return Ok(existing.clone());
        }

        let venue = Venue {
            id: state.next_id(),
            name: request.name,
            address: request.address,
            contact_phone: request.contact_phone,
        };
        state.venues.push(venue.clone());
        Ok(venue)
    }
}

#[async_trait]
impl PendingEventStore for InMemoryStore {
    async fn insert_draft(&self, draft: NewPendingEvent) -> Result<PendingEvent> {
        let mut state = self.state.lock().await;
        if state.drafts.contains_key(&draft.token) {
            return Err(SportsHubError::InvalidInput(format!("token {} already in use", draft.token)));
        }

        let pending = PendingEvent {
            id: state.next_id(),
            token: draft.token.clone(),
            draft_fields: Json(draft.draft_fields),
            image_payload: draft.image_payload,
            status: DraftStatus::Pending,
            data_complete: draft.completeness.data_complete,
            missing_fields: draft.completeness.missing_fields,
            created_at: draft.created_at,
            expires_at: draft.expires_at,
        };
        state.drafts.insert(draft.token, pending.clone());
        Ok(pending)
    }

    async fn find_draft(&self, token: &str) -> Result<Option<PendingEvent>> {
        let state = self.state.lock().await;
        Ok(state.drafts.get(token).cloned())
    }

    async fn update_draft_fields(
        &self,
        token: &str,
        fields: DraftFields,
        completeness: Completeness,
    ) -> Result<PendingEvent> {
        let mut state = self.state.lock().await;
        let draft = state.draft_mut(token)?;
        if draft.status != DraftStatus::Pending {
            return Err(not_pending(token, draft.status));
        }

        draft.draft_fields = Json(fields);
        draft.data_complete = completeness.data_complete;
        draft.missing_fields = completeness.missing_fields;
        Ok(draft.clone())
    }

    async fn set_draft_status(&self, token: &str, status: DraftStatus) -> Result<PendingEvent> {
        let mut state = self.state.lock().await;
        let draft = state.draft_mut(token)?;
        draft.status = status;
        Ok(draft.clone())
    }

    async fn expire_draft(&self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().await;
        let draft = state.draft_mut(token)?;
        if draft.status == DraftStatus::Pending && draft.is_expired(now) {
            draft.status = DraftStatus::Rejected;
            return Ok(true);
        }
        Ok(false)
    }

    async fn claim_draft(&self, token: &str, now: DateTime<Utc>) -> Result<PendingEvent> {
        let mut state = self.state.lock().await;
        let draft = state.draft_mut(token)?;
        if draft.status != DraftStatus::Pending {
            return Err(not_pending(token, draft.status));
        }
        if draft.is_expired(now) {
            draft.status = DraftStatus::Rejected;
            return Err(SportsHubError::ExpiredDraft { token: token.to_string() });
        }

        draft.status = DraftStatus::Promoting;
        Ok(draft.clone())
    }

    async fn release_draft(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let draft = state.draft_mut(token)?;
        if draft.status == DraftStatus::Promoting {
            draft.status = DraftStatus::Pending;
        }
        Ok(())
    }

    async fn promote_draft(&self, token: &str, request: CreateEventRequest, now: DateTime<Utc>) -> Result<Event> {
        let mut state = self.state.lock().await;
        let draft = state.draft_mut(token)?;
        if draft.status != DraftStatus::Promoting {
            return Err(not_pending(token, draft.status));
        }
        if draft.is_expired(now) {
            draft.status = DraftStatus::Rejected;
            return Err(SportsHubError::ExpiredDraft { token: token.to_string() });
        }

        let event = state.insert_event(request, now);
        state.draft_mut(token)?.status = DraftStatus::Confirmed;
        Ok(event)
    }

    async fn list_drafts(&self, status: DraftStatus) -> Result<Vec<PendingEvent>> {
        let state = self.state.lock().await;
        let mut drafts: Vec<PendingEvent> = state
            .drafts
            .values()
            .filter(|draft| draft.status == status)
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    async fn reject_expired_drafts(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut rejected = 0;
        for draft in state.drafts.values_mut() {
            let open = matches!(draft.status, DraftStatus::Pending | DraftStatus::Promoting);
            if open && draft.is_expired(now) {
                draft.status = DraftStatus::Rejected;
                rejected += 1;
            }
        }
        Ok(rejected)
    }
}

#[async_trait]
impl AccessCodeStore for InMemoryStore {
    async fn replace_active_code(&self, code: NewAuthorizationCode) -> Result<Option<AuthorizationCode>> {
        let mut state = self.state.lock().await;
        if state
            .access_codes
            .iter()
            .any(|existing| existing.active && existing.code == code.code)
        {
            debug!(admin_id = code.admin_id, "Generated access code collides with an active one");
            return Ok(None);
        }

        for existing in state.access_codes.iter_mut() {
            if existing.admin_id == code.admin_id {
                existing.active = false;
            }
        }

        let issued = AuthorizationCode {
            id: state.next_id(),
            code: code.code,
            admin_id: code.admin_id,
            active: true,
            phone: None,
            created_at: code.created_at,
            expires_at: code.expires_at,
            last_used_at: None,
        };
        state.access_codes.push(issued.clone());
        Ok(Some(issued))
    }

    async fn find_active_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        let state = self.state.lock().await;
        Ok(state
            .access_codes
            .iter()
            .find(|existing| existing.active && existing.code == code)
            .cloned())
    }

    async fn active_code_for_admin(&self, admin_id: i64) -> Result<Option<AuthorizationCode>> {
        let state = self.state.lock().await;
        Ok(state
            .access_codes
            .iter()
            .find(|existing| existing.active && existing.admin_id == admin_id)
            .cloned())
    }

    async fn record_code_use(&self, id: i64, phone: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().await;
        let code = state
            .access_codes
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or_else(|| SportsHubError::not_found("authorization code", id))?;
        code.last_used_at = Some(now);
        if let Some(phone) = phone {
            code.phone = Some(phone.to_string());
        }
        Ok(())
    }

    async fn find_vigent_code_for_phone(&self, phone: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>> {
        let state = self.state.lock().await;
        Ok(state
            .access_codes
            .iter()
            .find(|existing| existing.phone.as_deref() == Some(phone) && existing.is_vigent(now))
            .cloned())
    }
}

#[async_trait]
impl VerificationCodeStore for InMemoryStore {
    async fn insert_verification_code(&self, code: NewVerificationCode) -> Result<EmailVerificationCode> {
        let mut state = self.state.lock().await;
        for existing in state.verification_codes.iter_mut() {
            if existing.email == code.email && !existing.used {
                existing.used = true;
            }
        }

        let stored = EmailVerificationCode {
            id: state.next_id(),
            email: code.email,
            code: code.code,
            used: false,
            created_at: code.created_at,
            expires_at: code.expires_at,
        };
        state.verification_codes.push(stored.clone());
        Ok(stored)
    }

    async fn consume_verification_code(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state
            .verification_codes
            .iter_mut()
            .find(|existing| existing.email == email && existing.code == code && existing.is_usable(now))
        {
            Some(existing) => {
                existing.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_verification_codes(&self, before: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let initial = state.verification_codes.len();
        state.verification_codes.retain(|code| code.expires_at >= before);
        Ok((initial - state.verification_codes.len()) as u64)
    }
}

#[async_trait]
impl ProfileSettingsStore for InMemoryStore {
    async fn get_or_create_settings(&self, defaults: ProfileSettings) -> Result<ProfileSettings> {
        let mut state = self.state.lock().await;
        Ok(state.profile_settings.get_or_insert(defaults).clone())
    }

    async fn update_settings(&self, patch: UpdateProfileSettingsRequest) -> Result<ProfileSettings> {
        let mut state = self.state.lock().await;
        let settings = state
            .profile_settings
            .as_mut()
            .ok_or_else(|| SportsHubError::not_found("profile settings", PROFILE_SETTINGS_ID))?;
        patch.apply(settings);
        settings.updated_at = Utc::now();
        Ok(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime};

    fn event_request(capacity: i32) -> CreateEventRequest {
        CreateEventRequest {
            name: "Natación".to_string(),
            description: "Piscina municipal".to_string(),
            category_id: 1,
            venue_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            weekdays: vec![],
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            capacity_max: capacity,
            min_age: None,
            max_age: None,
            requirements: String::new(),
            image_url: None,
            origin: EventOrigin::Direct,
            data_complete: true,
        }
    }

    #[tokio::test]
    async fn test_failed_reservation_leaves_no_enrollment() {
        let store = InMemoryStore::new();
        let event = store.create_event(event_request(0)).await.unwrap();

        let result = store
            .create_enrollment(CreateEnrollmentRequest {
                user_id: 4,
                event_id: event.id,
                status: EnrollmentStatus::Confirmed,
                comment: String::new(),
            })
            .await;

        assert_matches!(result, Err(SportsHubError::CapacityExceeded { .. }));
        assert!(store.list_event_enrollments(event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_event_cascades() {
        let store = InMemoryStore::new();
        let event = store.create_event(event_request(3)).await.unwrap();
        store
            .create_enrollment(CreateEnrollmentRequest {
                user_id: 4,
                event_id: event.id,
                status: EnrollmentStatus::Pending,
                comment: String::new(),
            })
            .await
            .unwrap();

        store.delete_event(event.id).await.unwrap();
        assert!(store.list_user_enrollments(4).await.unwrap().is_empty());
    }

    fn draft(token: &str, expires_at: DateTime<Utc>) -> NewPendingEvent {
        NewPendingEvent {
            token: token.to_string(),
            draft_fields: DraftFields::new(),
            image_payload: None,
            completeness: Completeness::assess(&DraftFields::new()),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_catalog_names_are_unique_ignoring_case() {
        let store = InMemoryStore::new();
        let first = store
            .create_category(CreateCategoryRequest {
                name: "General".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let again = store
            .create_category(CreateCategoryRequest {
                name: "GENERAL".to_string(),
                description: "otra".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.name, "General");

        let venue = |name: &str| CreateVenueRequest {
            name: name.to_string(),
            address: String::new(),
            contact_phone: None,
        };
        let unassigned = store.create_venue(venue("Unassigned")).await.unwrap();
        assert_eq!(store.create_venue(venue("unassigned")).await.unwrap().id, unassigned.id);
        assert_ne!(store.create_venue(venue("Unassigned Norte")).await.unwrap().id, unassigned.id);
    }

    #[tokio::test]
    async fn test_only_one_claim_wins() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_draft(draft("claim001", now + chrono::Duration::hours(1))).await.unwrap();

        let claimed = store.claim_draft("claim001", now).await.unwrap();
        assert_eq!(claimed.status, DraftStatus::Promoting);
        assert_matches!(
            store.claim_draft("claim001", now).await,
            Err(SportsHubError::DraftNotPending { ref status, .. }) if status == "promoting"
        );

        store.release_draft("claim001").await.unwrap();
        store.claim_draft("claim001", now).await.unwrap();
        let event = store.promote_draft("claim001", event_request(10), now).await.unwrap();
        assert_eq!(event.capacity_available, 10);

        store.release_draft("claim001").await.unwrap();
        let draft = store.find_draft("claim001").await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_promote_rechecks_expiry() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let expires_at = now + chrono::Duration::minutes(1);
        store.insert_draft(draft("late0001", expires_at)).await.unwrap();
        store.claim_draft("late0001", now).await.unwrap();

        assert_matches!(
            store.promote_draft("late0001", event_request(10), expires_at).await,
            Err(SportsHubError::ExpiredDraft { .. })
        );
        let draft = store.find_draft("late0001").await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Rejected);
        assert!(store.list_events(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expire_leaves_decided_drafts_alone() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_draft(draft("done0001", now + chrono::Duration::minutes(1))).await.unwrap();
        store.claim_draft("done0001", now).await.unwrap();
        store.promote_draft("done0001", event_request(5), now).await.unwrap();

        let later = now + chrono::Duration::hours(2);
        assert!(!store.expire_draft("done0001", later).await.unwrap());
        assert_eq!(store.reject_expired_drafts(later).await.unwrap(), 0);
        let draft = store.find_draft("done0001").await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_settings_row_created_once() {
        let store = InMemoryStore::new();
        let first = store.get_or_create_settings(ProfileSettings::defaults(Utc::now())).await.unwrap();
        store
            .update_settings(UpdateProfileSettingsRequest {
                name_editable: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        let second = store.get_or_create_settings(ProfileSettings::defaults(Utc::now())).await.unwrap();
        assert!(!first.name_editable);
        assert!(second.name_editable);
    }
}
