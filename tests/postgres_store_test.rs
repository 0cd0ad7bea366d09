//! PostgreSQL repositories
//!
//! Runs only when `TEST_DATABASE_URL` points at a scratch database; every test
//! truncates all tables first.

mod helpers;

use std::sync::Arc;
use assert_matches::assert_matches;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use futures::future::join_all;
use serde_json::json;
use serial_test::serial;
use helpers::*;
use SportsHub::config::Settings;
use SportsHub::database::{connect, health_check, run_migrations, DatabasePool, DatabaseService};
use SportsHub::models::{
    Actor, CreateCategoryRequest, CreateEnrollmentRequest, CreateVenueRequest, DraftStatus, EnrollmentStatus, Event,
    NewAuthorizationCode, UpdateProfileSettingsRequest,
};
use SportsHub::services::{Collaborators, ServiceFactory};
use SportsHub::SportsHubError;

struct PgContext {
    pool: DatabasePool,
    database: DatabaseService,
    services: ServiceFactory,
    storage: Arc<FakeStorage>,
}

async fn pg_context() -> Option<PgContext> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return None;
        }
    };

    let mut config = Settings::default().database;
    config.url = url;
    config.max_connections = 8;
    config.connect_attempts = 1;
    let pool = connect(&config).await.expect("connecting to test database");
    run_migrations(&pool).await.expect("running migrations");
    health_check(&pool).await.expect("database health check");
    sqlx::query(
        "TRUNCATE enrollments, events, pending_events, categories, venues, authorization_codes, \
         email_verification_codes, profile_settings RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .expect("truncating tables");

    let database = DatabaseService::new(pool.clone());
    let storage = Arc::new(FakeStorage::default());
    let services = ServiceFactory::with_collaborators(
        &test_settings(),
        &database,
        Collaborators {
            storage: storage.clone(),
            email: Arc::new(FakeEmailSender::default()),
            identity: Arc::new(FakeIdentityLookup::default()),
        },
    );

    Some(PgContext {
        pool,
        database,
        services,
        storage,
    })
}

impl PgContext {
    async fn create_event(&self, capacity: i32) -> Event {
        let category = self
            .database
            .catalog
            .create_category(CreateCategoryRequest {
                name: "Natación".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let venue = self
            .database
            .catalog
            .create_venue(CreateVenueRequest {
                name: "Piscina El Roble".to_string(),
                address: "El Roble, Puntarenas".to_string(),
                contact_phone: None,
            })
            .await
            .unwrap();

        let mut request = event_request(capacity);
        request.category_id = category.id;
        request.venue_id = venue.id;
        self.database.events.create_event(request).await.unwrap()
    }

    async fn available(&self, event_id: i64) -> i32 {
        sqlx::query_scalar("SELECT capacity_available FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_row_lock_prevents_overselling() {
    let Some(ctx) = pg_context().await else { return };
    let event = ctx.create_event(3).await;

    let attempts = (1..=10).map(|user_id| {
        let service = ctx.services.enrollments.clone();
        tokio::spawn(async move {
            service
                .enroll(
                    &Actor::user(user_id),
                    CreateEnrollmentRequest {
                        user_id,
                        event_id: event.id,
                        status: EnrollmentStatus::Confirmed,
                        comment: String::new(),
                    },
                )
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, SportsHubError::CapacityExceeded { .. })));
    assert_eq!(ctx.available(event.id).await, 0);
}

#[tokio::test]
#[serial]
async fn test_cancel_and_delete_release_slots() {
    let Some(ctx) = pg_context().await else { return };
    let event = ctx.create_event(2).await;
    let enrollments = &ctx.services.enrollments;

    let first = enrollments
        .enroll(
            &Actor::user(1),
            CreateEnrollmentRequest {
                user_id: 1,
                event_id: event.id,
                status: EnrollmentStatus::Confirmed,
                comment: String::new(),
            },
        )
        .await
        .unwrap();
    let second = enrollments
        .enroll(
            &Actor::user(2),
            CreateEnrollmentRequest {
                user_id: 2,
                event_id: event.id,
                status: EnrollmentStatus::Confirmed,
                comment: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(ctx.available(event.id).await, 0);

    enrollments
        .set_status(&Actor::user(1), first.id, EnrollmentStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(ctx.available(event.id).await, 1);

    enrollments.delete(&Actor::user(2), second.id).await.unwrap();
    assert_eq!(ctx.available(event.id).await, 2);
}

#[tokio::test]
#[serial]
async fn test_draft_promotes_once() {
    let Some(ctx) = pg_context().await else { return };
    let session = ctx.services.pending_events.automation(Some(API_KEY)).unwrap();
    let submission = session
        .submit(json!({"nombre": "Voleibol", "descripcion": "Playa", "fecha_inicio": "2026-12-05"}))
        .await
        .unwrap();
    let code = ctx.services.access_codes.issue(&Actor::admin(ADMIN_ID)).await.unwrap().code;

    let (first, second) = tokio::join!(
        session.confirm(&submission.token, &code),
        session.confirm(&submission.token, &code)
    );
    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(events, 1);

    let draft = ctx.database.pending_events.find_draft(&submission.token).await.unwrap().unwrap();
    assert_eq!(draft.status, DraftStatus::Confirmed);
    assert!(draft.data_complete);
}

#[tokio::test]
#[serial]
async fn test_racing_confirms_upload_once() {
    let Some(ctx) = pg_context().await else { return };
    ctx.storage.slow_uploads(20);
    let session = ctx.services.pending_events.automation(Some(API_KEY)).unwrap();
    let submission = session
        .submit(json!({"nombre": "Remo", "imagen_base64": STANDARD.encode(PNG_BYTES)}))
        .await
        .unwrap();
    let code = ctx.services.access_codes.issue(&Actor::admin(ADMIN_ID)).await.unwrap().code;

    let (first, second) = tokio::join!(
        session.confirm(&submission.token, &code),
        session.confirm(&submission.token, &code)
    );
    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(ctx.storage.upload_names().len(), 1);

    let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(categories, 1);
}

#[tokio::test]
#[serial]
async fn test_claimed_draft_expiring_before_write_is_rejected() {
    let Some(ctx) = pg_context().await else { return };
    let session = ctx.services.pending_events.automation(Some(API_KEY)).unwrap();
    let submission = session.submit(json!({"nombre": "Kayak"})).await.unwrap();
    let drafts = &ctx.database.pending_events;

    let claimed = drafts.claim_draft(&submission.token, Utc::now()).await.unwrap();
    assert_eq!(claimed.status, DraftStatus::Promoting);
    assert_matches!(
        drafts.claim_draft(&submission.token, Utc::now()).await,
        Err(SportsHubError::DraftNotPending { .. })
    );

    let mut request = event_request(10);
    let category = ctx.database.catalog.create_category(CreateCategoryRequest {
        name: "General".to_string(),
        description: String::new(),
    });
    let venue = ctx.database.catalog.create_venue(CreateVenueRequest {
        name: "Unassigned".to_string(),
        address: String::new(),
        contact_phone: None,
    });
    request.category_id = category.await.unwrap().id;
    request.venue_id = venue.await.unwrap().id;

    let result = drafts
        .promote_draft(&submission.token, request, claimed.expires_at + Duration::seconds(1))
        .await;
    assert_matches!(result, Err(SportsHubError::ExpiredDraft { .. }));

    let draft = drafts.find_draft(&submission.token).await.unwrap().unwrap();
    assert_eq!(draft.status, DraftStatus::Rejected);
    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(events, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_category_creates_share_one_row() {
    let Some(ctx) = pg_context().await else { return };

    let creates = ["General", "general", "GENERAL", "General"].map(|name| {
        let catalog = ctx.database.catalog.clone();
        tokio::spawn(async move {
            catalog
                .create_category(CreateCategoryRequest {
                    name: name.to_string(),
                    description: String::new(),
                })
                .await
        })
    });
    let ids: Vec<i64> = join_all(creates)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").unwrap().id)
        .collect();
    assert!(ids.iter().all(|id| *id == ids[0]));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
#[serial]
async fn test_new_code_deactivates_previous_one() {
    let Some(ctx) = pg_context().await else { return };
    let admin = Actor::admin(ADMIN_ID);

    let first = ctx.services.access_codes.issue(&admin).await.unwrap();
    let second = ctx.services.access_codes.issue(&admin).await.unwrap();

    assert!(ctx.database.access_codes.find_active_code(&first.code).await.unwrap().is_none());
    ctx.services.access_codes.validate(&second.code, Some("+50688887777")).await.unwrap();
    assert!(ctx.services.access_codes.is_phone_authorized("+50688887777").await.unwrap());

    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authorization_codes WHERE active")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
#[serial]
async fn test_duplicate_active_code_is_reported_as_collision() {
    let Some(ctx) = pg_context().await else { return };
    let now = Utc::now();
    let code = |admin_id| NewAuthorizationCode {
        code: "DUPL1CAT".to_string(),
        admin_id,
        created_at: now,
        expires_at: now + Duration::days(3),
    };

    assert!(ctx.database.access_codes.replace_active_code(code(1)).await.unwrap().is_some());
    assert!(ctx.database.access_codes.replace_active_code(code(2)).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_expired_drafts_swept() {
    let Some(ctx) = pg_context().await else { return };
    let session = ctx.services.pending_events.automation(Some(API_KEY)).unwrap();
    let submission = session.submit(json!({"nombre": "Ajedrez"})).await.unwrap();

    sqlx::query("UPDATE pending_events SET expires_at = NOW() - INTERVAL '1 hour' WHERE token = $1")
        .bind(&submission.token)
        .execute(&ctx.pool)
        .await
        .unwrap();

    assert_eq!(ctx.services.pending_events.sweep_expired().await.unwrap(), 1);
    let draft = ctx.database.pending_events.find_draft(&submission.token).await.unwrap().unwrap();
    assert_eq!(draft.status, DraftStatus::Rejected);
}

#[tokio::test]
#[serial]
async fn test_profile_settings_singleton() {
    let Some(ctx) = pg_context().await else { return };

    let created = ctx.services.profile_settings.get().await.unwrap();
    assert_eq!(created.id, 1);
    assert!(created.email_editable);

    let updated = ctx
        .services
        .profile_settings
        .update(
            &Actor::admin(ADMIN_ID),
            UpdateProfileSettingsRequest {
                birthdate_editable: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.birthdate_editable);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profile_settings")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    assert_matches!(
        ctx.services
            .profile_settings
            .update(&Actor::user(5), UpdateProfileSettingsRequest::default())
            .await,
        Err(SportsHubError::PermissionDenied(_))
    );
}
