//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the SportsHub application.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::models::EnrollmentStatus;
use crate::utils::errors::{ErrorSeverity, SportsHubError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file appender on drop and must be held by `main`.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "sportshub.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(non_blocking).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking).boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .try_init()
        .map_err(|e| SportsHubError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log an enrollment status change
pub fn log_enrollment_transition(
    enrollment_id: i64,
    event_id: i64,
    from: Option<EnrollmentStatus>,
    to: Option<EnrollmentStatus>,
) {
    info!(
        enrollment_id = enrollment_id,
        event_id = event_id,
        from = from.map(|s| s.as_str()),
        to = to.map(|s| s.as_str()),
        "Enrollment transition applied"
    );
}

/// Log a capacity ledger adjustment
pub fn log_ledger_adjustment(event_id: i64, delta: i32, available: i32, max: i32) {
    debug!(
        event_id = event_id,
        delta = delta,
        capacity_available = available,
        capacity_max = max,
        "Capacity ledger adjusted"
    );
}

/// Log a skipped slot release; the ledger had already drifted to its ceiling
pub fn log_ledger_drift(event_id: i64, available: i32, max: i32) {
    warn!(
        event_id = event_id,
        capacity_available = available,
        capacity_max = max,
        "Slot release skipped: capacity already at maximum"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log automation engine (WhatsApp intake) actions
pub fn log_automation_action(token: &str, action: &str, details: Option<&str>) {
    info!(
        token = token,
        action = action,
        details = details,
        "Automation action performed"
    );
}

/// Log a collaborator failure that was absorbed locally
pub fn log_collaborator_failure(collaborator: &str, error: &str, context: Option<&str>) {
    error!(
        collaborator = collaborator,
        error = error,
        context = context,
        "Collaborator call failed"
    );
}

/// Log a failed operation at the level its error calls for
pub fn log_service_error(operation: &str, err: &SportsHubError) {
    let recoverable = err.is_recoverable();
    let user_facing = err.is_user_facing();
    match err.severity() {
        ErrorSeverity::Info => info!(operation, error = %err, recoverable, user_facing, "Operation failed"),
        ErrorSeverity::Warning => warn!(operation, error = %err, recoverable, user_facing, "Operation failed"),
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(operation, error = %err, recoverable, user_facing, severity = %err.severity(), "Operation failed")
        }
    }
}
