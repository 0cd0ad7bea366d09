//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub automation: AutomationConfig,
    pub access_codes: AccessCodeConfig,
    pub verification: VerificationConfig,
    pub events: EventDefaultsConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub id_lookup: IdLookupConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    /// Server-side cap on any single statement, so a stuck lock frees its pool slot
    pub statement_timeout_ms: u64,
    /// Connection attempts before giving up; the database may still be starting
    pub connect_attempts: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// External automation engine (WhatsApp intake) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutomationConfig {
    /// Shared secret expected in the `X-API-Key` header
    pub api_key: String,
    pub draft_ttl_hours: i64,
}

/// Administrator access code configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessCodeConfig {
    pub ttl_days: i64,
    pub length: usize,
}

/// Email verification code configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    pub ttl_minutes: i64,
    pub sends_per_hour: u32,
}

/// Defaults applied when materializing events
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventDefaultsConfig {
    pub default_capacity: i32,
    pub default_category: String,
    pub default_venue: String,
    pub placeholder_venue_address: String,
    pub default_start_time: String,
    pub default_end_time: String,
}

/// Image hosting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub api_url: String,
    pub cloud_name: String,
    pub upload_preset: String,
    pub folder: String,
    pub timeout_seconds: u64,
}

/// Transactional email configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub timeout_seconds: u64,
}

/// Government-ID lookup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdLookupConfig {
    pub url: String,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub json: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("SPORTSHUB").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::SportsHubError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/sportshub".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 30,
                statement_timeout_ms: 15_000,
                connect_attempts: 3,
            },
            redis: None,
            automation: AutomationConfig {
                api_key: String::new(),
                draft_ttl_hours: 24,
            },
            access_codes: AccessCodeConfig {
                ttl_days: 3,
                length: 8,
            },
            verification: VerificationConfig {
                ttl_minutes: 15,
                sends_per_hour: 5,
            },
            events: EventDefaultsConfig {
                default_capacity: 50,
                default_category: "General".to_string(),
                default_venue: "Unassigned".to_string(),
                placeholder_venue_address: "https://maps.google.com".to_string(),
                default_start_time: "08:00".to_string(),
                default_end_time: "17:00".to_string(),
            },
            storage: StorageConfig {
                api_url: "https://api.cloudinary.com/v1_1".to_string(),
                cloud_name: String::new(),
                upload_preset: String::new(),
                folder: "eventos".to_string(),
                timeout_seconds: 10,
            },
            email: EmailConfig {
                api_url: "https://api.brevo.com/v3".to_string(),
                api_key: String::new(),
                sender_email: "noreply@puntarenassemueve.com".to_string(),
                sender_name: "Puntarenas Se Mueve".to_string(),
                timeout_seconds: 10,
            },
            id_lookup: IdLookupConfig {
                url: "https://servicioselectorales.tse.go.cr/chc/consulta_cedula.aspx".to_string(),
                timeout_seconds: 15,
                cache_ttl_seconds: 86400,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
                json: false,
            },
        }
    }
}
