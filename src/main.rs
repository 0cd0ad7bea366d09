//! SportsHub maintenance runner
//!
//! Applies migrations and performs the periodic housekeeping there is no
//! in-process scheduler for. Meant to be run from cron.

use anyhow::Context;
use tracing::{info, warn};

use SportsHub::{
    config::Settings,
    database::{self, DatabaseService},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("loading configuration")?;
    settings.validate()?;

    // Initialize logging
    let _guard = logging::init_logging(&settings.logging)?;
    info!("Starting {} maintenance run", SportsHub::info());

    // Initialize database connection
    let db_pool = database::connect(&settings.database).await.context("connecting to database")?;
    database::run_migrations(&db_pool).await?;
    let db_health = database::health_check(&db_pool).await.context("database health check")?;
    info!(latency_ms = db_health.latency.as_millis() as u64, "Database reachable");

    let database_service = DatabaseService::new(db_pool);
    let services = ServiceFactory::new(&settings, &database_service)?;

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!(issue = %issue, "Degraded service");
    }

    let mut failures = 0;

    match services.profile_settings.get().await {
        Ok(profile) => info!(updated_at = %profile.updated_at, "Profile settings present"),
        Err(e) => {
            logging::log_service_error("ensure_profile_settings", &e);
            failures += 1;
        }
    }

    let swept = match services.pending_events.sweep_expired().await {
        Ok(swept) => swept,
        Err(e) => {
            logging::log_service_error("sweep_expired_drafts", &e);
            failures += 1;
            0
        }
    };

    let purged = match services.verification.purge_expired().await {
        Ok(purged) => purged,
        Err(e) => {
            logging::log_service_error("purge_verification_codes", &e);
            failures += 1;
            0
        }
    };

    info!(
        expired_drafts = swept,
        purged_verification_codes = purged,
        failures = failures,
        "Maintenance run finished"
    );

    if failures > 0 {
        anyhow::bail!("{} maintenance task(s) failed", failures);
    }
    Ok(())
}
