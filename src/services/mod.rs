//! Services module
//!
//! This module contains business logic services

pub mod access_code;
pub mod enrollment;
pub mod event;
pub mod identity;
pub mod ledger;
pub mod materializer;
pub mod notification;
pub mod pending_event;
pub mod profile;
pub mod redis;
pub mod storage;
pub mod verification;

// Re-export commonly used services
pub use access_code::AccessCodeService;
pub use enrollment::EnrollmentService;
pub use event::EventService;
pub use identity::{CachedIdentityLookup, IdentityLookup, TseIdentityLookup};
pub use ledger::{LedgerEffect, LedgerOutcome};
pub use materializer::{EventMaterializer, ImageSource};
pub use notification::{BrevoEmailSender, EmailSender, NotificationService, NotificationStats, Recipient};
pub use pending_event::{AutomationSession, DraftSummary, PendingEventService, Submission};
pub use profile::ProfileSettingsService;
pub use redis::RedisCache;
pub use storage::{CloudinaryStorage, ObjectStorage};
pub use verification::VerificationService;

use std::sync::Arc;
use tracing::info;
use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Outbound SaaS clients, swappable for fakes
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn ObjectStorage>,
    pub email: Arc<dyn EmailSender>,
    pub identity: Arc<dyn IdentityLookup>,
}

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub events: EventService,
    pub enrollments: EnrollmentService,
    pub access_codes: AccessCodeService,
    pub materializer: EventMaterializer,
    pub pending_events: PendingEventService,
    pub verification: VerificationService,
    pub notifications: NotificationService,
    pub identity: Arc<dyn IdentityLookup>,
    pub profile_settings: ProfileSettingsService,
    redis: Option<RedisCache>,
    storage_enabled: bool,
    email_enabled: bool,
}

impl ServiceFactory {
    /// Wire every service against the production collaborators
    pub fn new(settings: &Settings, database: &DatabaseService) -> Result<Self> {
        let redis = settings.redis.clone().map(RedisCache::new).transpose()?;
        let storage = CloudinaryStorage::new(settings.storage.clone())?;
        let storage_enabled = storage.is_enabled();
        let email = BrevoEmailSender::new(settings.email.clone(), settings.verification.ttl_minutes)?;
        let tse = TseIdentityLookup::new(&settings.id_lookup)?;

        let collaborators = Collaborators {
            storage: Arc::new(storage),
            email: Arc::new(email),
            identity: Arc::new(CachedIdentityLookup::new(
                Arc::new(tse),
                redis.clone(),
                settings.id_lookup.cache_ttl_seconds,
            )),
        };

        let mut factory = Self::with_collaborators(settings, database, collaborators);
        factory.redis = redis;
        factory.storage_enabled = storage_enabled;
        factory.email_enabled = !settings.email.api_key.is_empty();

        info!(
            redis = factory.redis.is_some(),
            storage = storage_enabled,
            email = factory.email_enabled,
            "Services initialized"
        );
        Ok(factory)
    }

    /// Wire every service against the given collaborators
    pub fn with_collaborators(settings: &Settings, database: &DatabaseService, collaborators: Collaborators) -> Self {
        let access_codes = AccessCodeService::new(database.access_codes.clone(), settings.access_codes.clone());
        let materializer = EventMaterializer::new(
            database.catalog.clone(),
            database.events.clone(),
            database.pending_events.clone(),
            collaborators.storage,
            settings.events.clone(),
        );
        let pending_events = PendingEventService::new(
            database.pending_events.clone(),
            access_codes.clone(),
            materializer.clone(),
            settings.automation.clone(),
        );

        Self {
            events: EventService::new(database.events.clone()),
            enrollments: EnrollmentService::new(database.enrollments.clone(), database.events.clone()),
            access_codes,
            materializer,
            pending_events,
            verification: VerificationService::new(
                database.verification_codes.clone(),
                collaborators.email.clone(),
                settings.verification.clone(),
            ),
            notifications: NotificationService::new(collaborators.email),
            identity: collaborators.identity,
            profile_settings: ProfileSettingsService::new(database.profile_settings.clone()),
            redis: None,
            storage_enabled: true,
            email_enabled: true,
        }
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let redis_healthy = match &self.redis {
            Some(cache) => Some(cache.health_check().await.is_ok()),
            None => None,
        };

        ServiceHealthStatus {
            redis_healthy,
            storage_enabled: self.storage_enabled,
            email_enabled: self.email_enabled,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    /// `None` when no cache is configured
    pub redis_healthy: Option<bool>,
    pub storage_enabled: bool,
    pub email_enabled: bool,
}

impl ServiceHealthStatus {
    /// Only an unreachable configured cache counts as unhealthy; SaaS gaps degrade features
    pub fn is_healthy(&self) -> bool {
        self.redis_healthy != Some(false)
    }

    /// Get list of degraded services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.redis_healthy == Some(false) {
            issues.push("Redis connection failed".to_string());
        }
        if !self.storage_enabled {
            issues.push("Image storage not configured, events will have no images".to_string());
        }
        if !self.email_enabled {
            issues.push("Email not configured, verification codes cannot be sent".to_string());
        }

        issues
    }
}
