//! Test context for unified test setup
//!
//! Every service wired against one shared in-memory store and fake collaborators.

use std::sync::Arc;
use SportsHub::config::Settings;
use SportsHub::database::DatabaseService;
use SportsHub::models::{Actor, CreateEnrollmentRequest, Enrollment, EnrollmentStatus, Event};
use SportsHub::services::{Collaborators, ServiceFactory};

use super::fakes::{FakeEmailSender, FakeIdentityLookup, FakeStorage};
use super::test_data::event_request;

pub const API_KEY: &str = "test-automation-key";
pub const ADMIN_ID: i64 = 1;

pub struct TestContext {
    pub settings: Settings,
    pub database: DatabaseService,
    pub services: ServiceFactory,
    pub storage: Arc<FakeStorage>,
    pub email: Arc<FakeEmailSender>,
    pub identity: Arc<FakeIdentityLookup>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let _ = tracing_subscriber::fmt::try_init();

        let database = DatabaseService::in_memory();
        let storage = Arc::new(FakeStorage::default());
        let email = Arc::new(FakeEmailSender::default());
        let identity = Arc::new(FakeIdentityLookup::default());

        let services = ServiceFactory::with_collaborators(
            &settings,
            &database,
            Collaborators {
                storage: storage.clone(),
                email: email.clone(),
                identity: identity.clone(),
            },
        );

        Self {
            settings,
            database,
            services,
            storage,
            email,
            identity,
        }
    }

    pub fn admin(&self) -> Actor {
        Actor::admin(ADMIN_ID)
    }

    /// Issue a fresh access code for the test administrator
    pub async fn issue_code(&self) -> String {
        self.services
            .access_codes
            .issue(&self.admin())
            .await
            .expect("issuing access code")
            .code
    }

    pub async fn create_event(&self, capacity: i32) -> Event {
        self.database
            .events
            .create_event(event_request(capacity))
            .await
            .expect("creating event")
    }

    pub async fn reload_event(&self, id: i64) -> Event {
        self.database
            .events
            .find_event(id)
            .await
            .expect("loading event")
            .expect("event exists")
    }

    pub async fn enroll(&self, user_id: i64, event_id: i64, status: EnrollmentStatus) -> SportsHub::Result<Enrollment> {
        self.enroll_with(&Actor::user(user_id), user_id, event_id, status).await
    }

    /// Pending enrollment for `user_id` requested by `actor`
    pub async fn enroll_as(&self, actor: Actor, user_id: i64, event_id: i64) -> SportsHub::Result<Enrollment> {
        self.enroll_with(&actor, user_id, event_id, EnrollmentStatus::Pending).await
    }

    async fn enroll_with(
        &self,
        actor: &Actor,
        user_id: i64,
        event_id: i64,
        status: EnrollmentStatus,
    ) -> SportsHub::Result<Enrollment> {
        self.services
            .enrollments
            .enroll(
                actor,
                CreateEnrollmentRequest {
                    user_id,
                    event_id,
                    status,
                    comment: String::new(),
                },
            )
            .await
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.automation.api_key = API_KEY.to_string();
    settings.logging.level = "debug".to_string();
    settings
}
