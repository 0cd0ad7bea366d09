//! Data models module
//!
//! This module contains all data structures used throughout the application

use thiserror::Error;

pub mod event;
pub mod enrollment;
pub mod pending_event;
pub mod access_code;
pub mod catalog;
pub mod profile;
pub mod user;
pub mod identity;

// Re-export commonly used models
pub use event::{Event, EventStatus, EventOrigin, CreateEventRequest, UpdateEventRequest};
pub use enrollment::{Enrollment, EnrollmentStatus, CreateEnrollmentRequest, UpdateEnrollmentRequest};
pub use pending_event::{PendingEvent, NewPendingEvent, DraftStatus, DraftFields, Completeness, EDITABLE_FIELDS, REQUIRED_FIELDS};
pub use access_code::{AuthorizationCode, NewAuthorizationCode, IssuedCode, EmailVerificationCode, NewVerificationCode};
pub use catalog::{Category, CreateCategoryRequest, Venue, CreateVenueRequest};
pub use profile::{ProfileSettings, UpdateProfileSettingsRequest, PROFILE_SETTINGS_ID};
pub use user::{Actor, Role};
pub use identity::IdentityRecord;

/// A stored text value did not name a known enum variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseVariantError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseVariantError {
    pub fn new(kind: &'static str, value: String) -> Self {
        Self { kind, value }
    }
}
