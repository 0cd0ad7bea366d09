//! PostgreSQL pool for the stores
//!
//! Sessions announce themselves as `sportshub` and run with a server-side
//! statement timeout, so a transaction stuck behind an event or draft row lock
//! gives its pool slot back. [`connect`] retries while the database is still
//! starting, which the cron-driven maintenance run depends on.

use std::time::{Duration, Instant};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, warn};
use crate::config::settings::DatabaseConfig;
use crate::utils::errors::Result;

pub type DatabasePool = PgPool;

const APPLICATION_NAME: &str = "sportshub";
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Pool state reported by [`health_check`]
#[derive(Debug, Clone, Copy)]
pub struct PoolHealth {
    pub latency: Duration,
    pub connections: u32,
    pub idle: usize,
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let statement_timeout = config.statement_timeout_ms.to_string();
    let options = config
        .url
        .parse::<PgConnectOptions>()?
        .application_name(APPLICATION_NAME)
        .options([("statement_timeout", statement_timeout.as_str())]);
    Ok(options)
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
}

/// Doubling delay before retry `attempt` (1-based)
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.saturating_pow(attempt.saturating_sub(1).min(5))
}

/// Open the pool, retrying up to `connect_attempts` times
pub async fn connect(config: &DatabaseConfig) -> Result<DatabasePool> {
    let options = connect_options(config)?;
    let attempts = config.connect_attempts.max(1);

    let mut attempt = 1;
    loop {
        match pool_options(config).connect_with(options.clone()).await {
            Ok(pool) => {
                info!(
                    attempt = attempt,
                    max_connections = config.max_connections,
                    statement_timeout_ms = config.statement_timeout_ms,
                    "Database pool ready"
                );
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                let delay = retry_delay(attempt);
                warn!(attempt = attempt, error = %e, retry_in_ms = delay.as_millis() as u64, "Database not reachable");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(pool).await?;

    info!(known_migrations = migrator.iter().count(), "Schema up to date");
    Ok(())
}

/// Round-trip a trivial query and report pool occupancy
pub async fn health_check(pool: &DatabasePool) -> Result<PoolHealth> {
    let started = Instant::now();
    sqlx::query("SELECT 1").execute(pool).await?;

    let health = PoolHealth {
        latency: started.elapsed(),
        connections: pool.size(),
        idle: pool.num_idle(),
    };
    debug!(
        latency_ms = health.latency.as_millis() as u64,
        connections = health.connections,
        idle = health.idle,
        "Database healthy"
    );
    Ok(health)
}
