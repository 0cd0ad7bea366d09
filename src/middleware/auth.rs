//! Authorization policy
//!
//! Every service checks its caller through [`can`] before touching state.
//! Automation-engine calls carry no user and are checked against the shared
//! API key instead.

use tracing::{debug, warn};
use crate::models::{Actor, Role};
use crate::utils::errors::{SportsHubError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Events,
    /// One user's enrollment
    Enrollment { owner_id: i64 },
    /// Enrollments across all users
    AllEnrollments,
    PendingEvents,
    AccessCodes,
    ProfileSettings,
}

/// Whether `actor` may perform `action` on `resource`
pub fn can(actor: &Actor, action: Action, resource: Resource) -> bool {
    if actor.is_admin() {
        return true;
    }

    match resource {
        Resource::Events | Resource::ProfileSettings => action == Action::Read,
        Resource::Enrollment { owner_id } => actor.role == Role::Authenticated && actor.is(owner_id),
        Resource::AllEnrollments | Resource::PendingEvents | Resource::AccessCodes => false,
    }
}

/// [`can`] as a `Result`, for use with `?`
pub fn require(actor: &Actor, action: Action, resource: Resource) -> Result<()> {
    if can(actor, action, resource) {
        return Ok(());
    }

    warn!(
        user_id = actor.user_id,
        role = ?actor.role,
        action = ?action,
        resource = ?resource,
        "Permission denied"
    );
    Err(SportsHubError::PermissionDenied(format!("{:?} on {:?} not allowed", action, resource)))
}

/// Shared-secret check for automation engine requests
#[derive(Clone)]
pub struct ApiKeyGuard {
    expected: String,
}

impl ApiKeyGuard {
    pub fn new(expected: impl Into<String>) -> Self {
        Self { expected: expected.into() }
    }

    /// Compare the presented `X-API-Key` header value in constant time
    pub fn verify(&self, presented: Option<&str>) -> Result<()> {
        let presented = presented.unwrap_or_default();
        if !self.expected.is_empty()
            && constant_time_eq::constant_time_eq(presented.as_bytes(), self.expected.as_bytes())
        {
            debug!("Automation API key accepted");
            return Ok(());
        }

        warn!("Invalid or missing automation API key");
        Err(SportsHubError::Authentication("invalid or missing API key".to_string()))
    }
}

impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard").field("expected", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_events_are_public_read_admin_write() {
        assert!(can(&Actor::anonymous(), Action::Read, Resource::Events));
        assert!(can(&Actor::user(3), Action::Read, Resource::Events));
        assert!(!can(&Actor::user(3), Action::Create, Resource::Events));
        assert!(!can(&Actor::anonymous(), Action::Update, Resource::Events));
        assert!(can(&Actor::admin(1), Action::Delete, Resource::Events));
    }

    #[test]
    fn test_enrollment_ownership() {
        let own = Resource::Enrollment { owner_id: 3 };
        assert!(can(&Actor::user(3), Action::Create, own));
        assert!(can(&Actor::user(3), Action::Update, own));
        assert!(can(&Actor::user(3), Action::Delete, own));
        assert!(!can(&Actor::user(4), Action::Update, own));
        assert!(!can(&Actor::anonymous(), Action::Read, own));
        assert!(can(&Actor::admin(1), Action::Update, own));
        assert!(!can(&Actor::user(3), Action::Read, Resource::AllEnrollments));
    }

    #[test]
    fn test_admin_only_resources() {
        for resource in [Resource::PendingEvents, Resource::AccessCodes, Resource::AllEnrollments] {
            assert!(!can(&Actor::user(3), Action::Read, resource));
            assert!(can(&Actor::admin(1), Action::Read, resource));
        }
    }

    #[test]
    fn test_profile_settings() {
        assert!(can(&Actor::anonymous(), Action::Read, Resource::ProfileSettings));
        assert!(!can(&Actor::user(3), Action::Update, Resource::ProfileSettings));
        assert!(can(&Actor::admin(1), Action::Update, Resource::ProfileSettings));
    }

    #[test]
    fn test_require_maps_to_permission_denied() {
        assert_matches!(
            require(&Actor::user(3), Action::Create, Resource::AccessCodes),
            Err(SportsHubError::PermissionDenied(_))
        );
    }

    #[test]
    fn test_api_key_guard() {
        let guard = ApiKeyGuard::new("s3cret");
        assert!(guard.verify(Some("s3cret")).is_ok());
        assert_matches!(guard.verify(Some("s3cre")), Err(SportsHubError::Authentication(_)));
        assert_matches!(guard.verify(None), Err(SportsHubError::Authentication(_)));
        assert!(ApiKeyGuard::new("").verify(Some("")).is_err());
    }
}
