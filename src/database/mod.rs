//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod store;
pub mod memory;
pub mod repositories;
pub mod service;

// Re-export commonly used database components
pub use connection::{DatabasePool, PoolHealth, connect, run_migrations, health_check};
pub use store::{
    EventStore, EnrollmentStore, CatalogStore, PendingEventStore, AccessCodeStore,
    VerificationCodeStore, ProfileSettingsStore,
};
pub use memory::InMemoryStore;
pub use repositories::{
    EventRepository, EnrollmentRepository, CatalogRepository, PendingEventRepository,
    AccessCodeRepository, ProfileSettingsRepository,
};
pub use service::DatabaseService;
