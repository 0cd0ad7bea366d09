//! Database service layer
//!
//! Bundles one handle per storage trait so services can be wired against
//! PostgreSQL or the in-memory store alike.

use std::sync::Arc;
use crate::database::memory::InMemoryStore;
use crate::database::store::*;
use crate::database::{
    DatabasePool, EventRepository, EnrollmentRepository, CatalogRepository,
    PendingEventRepository, AccessCodeRepository, ProfileSettingsRepository,
};

#[derive(Clone)]
pub struct DatabaseService {
    pub events: Arc<dyn EventStore>,
    pub enrollments: Arc<dyn EnrollmentStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub pending_events: Arc<dyn PendingEventStore>,
    pub access_codes: Arc<dyn AccessCodeStore>,
    pub verification_codes: Arc<dyn VerificationCodeStore>,
    pub profile_settings: Arc<dyn ProfileSettingsStore>,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        let access_codes = Arc::new(AccessCodeRepository::new(pool.clone()));

        Self {
            events: Arc::new(EventRepository::new(pool.clone())),
            enrollments: Arc::new(EnrollmentRepository::new(pool.clone())),
            catalog: Arc::new(CatalogRepository::new(pool.clone())),
            pending_events: Arc::new(PendingEventRepository::new(pool.clone())),
            access_codes: access_codes.clone(),
            verification_codes: access_codes,
            profile_settings: Arc::new(ProfileSettingsRepository::new(pool)),
        }
    }

    /// Every store backed by one shared in-memory state
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(InMemoryStore::new()))
    }

    pub fn from_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            events: store.clone(),
            enrollments: store.clone(),
            catalog: store.clone(),
            pending_events: store.clone(),
            access_codes: store.clone(),
            verification_codes: store.clone(),
            profile_settings: store,
        }
    }
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService").finish_non_exhaustive()
    }
}
