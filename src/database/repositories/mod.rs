//! Database repositories module
//!
//! PostgreSQL implementations of the storage traits

pub mod event;
pub mod enrollment;
pub mod catalog;
pub mod pending_event;
pub mod access_code;
pub mod profile;

// Re-export repositories
pub use event::EventRepository;
pub use enrollment::EnrollmentRepository;
pub use catalog::CatalogRepository;
pub use pending_event::PendingEventRepository;
pub use access_code::AccessCodeRepository;
pub use profile::ProfileSettingsRepository;
