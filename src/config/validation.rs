//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{SportsHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_automation_config(&settings.automation)?;
    validate_access_code_config(&settings.access_codes)?;
    validate_verification_config(&settings.verification)?;
    validate_event_defaults(&settings.events)?;
    validate_timeout("Storage", settings.storage.timeout_seconds)?;
    validate_timeout("Email", settings.email.timeout_seconds)?;
    validate_timeout("Identity lookup", settings.id_lookup.timeout_seconds)?;
    validate_logging_config(&settings.logging)?;

    if let Some(ref redis_config) = settings.redis {
        validate_redis_config(redis_config)?;
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SportsHubError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(SportsHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(SportsHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.connect_attempts == 0 {
        return Err(SportsHubError::Config(
            "Connect attempts must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SportsHubError::Config(
            "Redis URL is required".to_string()
        ));
    }

    Ok(())
}

/// Validate automation engine configuration
fn validate_automation_config(config: &super::AutomationConfig) -> Result<()> {
    if config.api_key.is_empty() {
        return Err(SportsHubError::Config(
            "Automation API key is required".to_string()
        ));
    }

    if config.draft_ttl_hours <= 0 {
        return Err(SportsHubError::Config(
            "Pending event TTL must be positive".to_string()
        ));
    }

    Ok(())
}

fn validate_access_code_config(config: &super::AccessCodeConfig) -> Result<()> {
    if config.ttl_days <= 0 {
        return Err(SportsHubError::Config(
            "Access code TTL must be positive".to_string()
        ));
    }

    if config.length < 6 {
        return Err(SportsHubError::Config(
            "Access codes must be at least 6 characters".to_string()
        ));
    }

    Ok(())
}

fn validate_verification_config(config: &super::VerificationConfig) -> Result<()> {
    if config.ttl_minutes <= 0 {
        return Err(SportsHubError::Config(
            "Verification code TTL must be positive".to_string()
        ));
    }

    if config.sends_per_hour == 0 {
        return Err(SportsHubError::Config(
            "Verification sends per hour must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_event_defaults(config: &super::EventDefaultsConfig) -> Result<()> {
    if config.default_capacity <= 0 {
        return Err(SportsHubError::Config(
            "Default capacity must be greater than 0".to_string()
        ));
    }

    if config.default_category.trim().is_empty() || config.default_venue.trim().is_empty() {
        return Err(SportsHubError::Config(
            "Default category and venue names are required".to_string()
        ));
    }

    for time in [&config.default_start_time, &config.default_end_time] {
        if chrono::NaiveTime::parse_from_str(time, "%H:%M").is_err() {
            return Err(SportsHubError::Config(
                format!("Invalid default time: {}", time)
            ));
        }
    }

    Ok(())
}

fn validate_timeout(name: &str, seconds: u64) -> Result<()> {
    if seconds == 0 {
        return Err(SportsHubError::Config(
            format!("{} timeout must be greater than 0", name)
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(SportsHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(SportsHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
