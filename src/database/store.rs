//! Storage traits
//!
//! Services talk to persistence only through these traits. The PostgreSQL
//! repositories and the in-memory store both implement every one of them, and
//! both route capacity changes through [`crate::services::ledger`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::models::*;
use crate::utils::errors::Result;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, request: CreateEventRequest) -> Result<Event>;

    async fn find_event(&self, id: i64) -> Result<Option<Event>>;

    /// Apply an edit under the event lock. A `capacity_max` change resizes the ledger.
    async fn update_event(&self, id: i64, request: UpdateEventRequest) -> Result<Event>;

    /// Delete the event together with its enrollments
    async fn delete_event(&self, id: i64) -> Result<()>;

    async fn list_events(&self, status: Option<EventStatus>) -> Result<Vec<Event>>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Insert an enrollment. Creating it confirmed reserves a slot atomically.
    async fn create_enrollment(&self, request: CreateEnrollmentRequest) -> Result<Enrollment>;

    async fn find_enrollment(&self, id: i64) -> Result<Option<Enrollment>>;

    /// Apply an edit with the enrollment and event rows locked
    async fn update_enrollment(&self, id: i64, request: UpdateEnrollmentRequest) -> Result<Enrollment>;

    /// Delete an enrollment, releasing its slot if it was confirmed
    async fn delete_enrollment(&self, id: i64) -> Result<Enrollment>;

    async fn list_event_enrollments(&self, event_id: i64) -> Result<Vec<Enrollment>>;

    async fn list_user_enrollments(&self, user_id: i64) -> Result<Vec<Enrollment>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// First category whose name contains `fragment`, ignoring case
    async fn find_category_matching(&self, fragment: &str) -> Result<Option<Category>>;

    /// Insert the category, or return the one already holding that name (ignoring case)
    async fn create_category(&self, request: CreateCategoryRequest) -> Result<Category>;

    /// First venue whose name contains `fragment`, ignoring case
    async fn find_venue_matching(&self, fragment: &str) -> Result<Option<Venue>>;

    /// Insert the venue, or return the one already holding that name (ignoring case)
    async fn create_venue(&self, request: CreateVenueRequest) -> Result<Venue>;
}

#[async_trait]
pub trait PendingEventStore: Send + Sync {
    async fn insert_draft(&self, draft: NewPendingEvent) -> Result<PendingEvent>;

    async fn find_draft(&self, token: &str) -> Result<Option<PendingEvent>>;

    /// Replace the draft's fields, failing with `DraftNotPending` unless it is still pending
    async fn update_draft_fields(
        &self,
        token: &str,
        fields: DraftFields,
        completeness: Completeness,
    ) -> Result<PendingEvent>;

    /// Set the status regardless of the current one
    async fn set_draft_status(&self, token: &str, status: DraftStatus) -> Result<PendingEvent>;

    /// Reject the draft if it is still pending and expired at `now`.
    /// Returns whether it changed.
    async fn expire_draft(&self, token: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Move a pending, unexpired draft to `promoting` so only one caller
    /// materializes it. A pending draft found expired is rejected and the
    /// call fails with `ExpiredDraft`; any other status gives `DraftNotPending`.
    async fn claim_draft(&self, token: &str, now: DateTime<Utc>) -> Result<PendingEvent>;

    /// Hand a claimed draft back to `pending`. No-op for any other status.
    async fn release_draft(&self, token: &str) -> Result<()>;

    /// Insert the event and mark the claimed draft confirmed in one transaction.
    /// A draft that expired while claimed is rejected instead and the call
    /// fails with `ExpiredDraft`.
    async fn promote_draft(&self, token: &str, request: CreateEventRequest, now: DateTime<Utc>) -> Result<Event>;

    async fn list_drafts(&self, status: DraftStatus) -> Result<Vec<PendingEvent>>;

    /// Reject every pending or claimed draft whose expiry is at or before `now`
    async fn reject_expired_drafts(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait AccessCodeStore: Send + Sync {
    /// Deactivate the admin's active code and insert `code` as the new one.
    /// Returns `None` when `code.code` collides with another active code.
    async fn replace_active_code(&self, code: NewAuthorizationCode) -> Result<Option<AuthorizationCode>>;

    async fn find_active_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    async fn active_code_for_admin(&self, admin_id: i64) -> Result<Option<AuthorizationCode>>;

    /// Stamp last use and, when given, bind the phone number to the code
    async fn record_code_use(&self, id: i64, phone: Option<&str>, now: DateTime<Utc>) -> Result<()>;

    async fn find_vigent_code_for_phone(&self, phone: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>>;
}

#[async_trait]
pub trait VerificationCodeStore: Send + Sync {
    /// Store a new code, retiring any earlier unused code for the same address
    async fn insert_verification_code(&self, code: NewVerificationCode) -> Result<EmailVerificationCode>;

    /// Mark the code used if it is unused and unexpired. Only one caller can win.
    async fn consume_verification_code(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Remove codes that expired before `before`
    async fn purge_verification_codes(&self, before: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait ProfileSettingsStore: Send + Sync {
    /// Read the settings row, creating it from `defaults` if missing
    async fn get_or_create_settings(&self, defaults: ProfileSettings) -> Result<ProfileSettings>;

    async fn update_settings(&self, patch: UpdateProfileSettingsRequest) -> Result<ProfileSettings>;
}
