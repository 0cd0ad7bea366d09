//! Error handling for SportsHub
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use std::fmt;
use thiserror::Error;

/// Main error type for SportsHub
#[derive(Error, Debug)]
pub enum SportsHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("No slots left for event {event_id}")]
    CapacityExceeded { event_id: i64 },

    #[error("Invalid authorization code: {reason}")]
    InvalidAuthCode { reason: AuthCodeRejection },

    #[error("Pending event {token} has expired")]
    ExpiredDraft { token: String },

    #[error("Pending event {token} is no longer pending (status: {status})")]
    DraftNotPending { token: String, status: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Object storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Email delivery error: {0}")]
    Email(#[from] EmailError),

    #[error("Identity lookup error: {0}")]
    IdLookup(#[from] IdLookupError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an authorization code was refused.
///
/// Callers see a single rejection class; the reason is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCodeRejection {
    NotFound,
    Expired,
}

impl fmt::Display for AuthCodeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthCodeRejection::NotFound => write!(f, "code not found or deactivated"),
            AuthCodeRejection::Expired => write!(f, "code expired"),
        }
    }
}

/// Object storage specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object storage timeout")]
    Timeout,

    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),

    #[error("Object storage is not configured")]
    NotConfigured,
}

/// Transactional email specific errors
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email API request failed: {0}")]
    RequestFailed(String),

    #[error("Email API timeout")]
    Timeout,

    #[error("Email delivery is not configured")]
    NotConfigured,
}

/// Government-ID lookup specific errors
#[derive(Error, Debug)]
pub enum IdLookupError {
    #[error("Lookup request failed: {0}")]
    RequestFailed(String),

    #[error("Lookup timeout")]
    Timeout,

    #[error("Unexpected lookup page: {0}")]
    InvalidResponse(String),
}

/// Result type alias for SportsHub operations
pub type Result<T> = std::result::Result<T, SportsHubError>;

/// Result type alias for object storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for email operations
pub type EmailResult<T> = std::result::Result<T, EmailError>;

/// Result type alias for identity lookups
pub type IdLookupResult<T> = std::result::Result<T, IdLookupError>;

impl SportsHubError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SportsHubError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            SportsHubError::Database(_) => false,
            SportsHubError::Migration(_) => false,
            SportsHubError::CapacityExceeded { .. } => true,
            SportsHubError::InvalidAuthCode { .. } => true,
            SportsHubError::ExpiredDraft { .. } => false,
            SportsHubError::DraftNotPending { .. } => false,
            SportsHubError::NotFound { .. } => false,
            SportsHubError::Storage(_) => true,
            SportsHubError::Email(_) => true,
            SportsHubError::IdLookup(_) => true,
            SportsHubError::Config(_) => false,
            SportsHubError::PermissionDenied(_) => false,
            SportsHubError::Authentication(_) => false,
            SportsHubError::InvalidInput(_) => false,
            SportsHubError::RateLimitExceeded => true,
            SportsHubError::Redis(_) => true,
            SportsHubError::Http(_) => true,
            SportsHubError::Serialization(_) => false,
            SportsHubError::Io(_) => true,
        }
    }

    /// Whether the message is meant to reach the end user verbatim
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SportsHubError::CapacityExceeded { .. }
                | SportsHubError::InvalidAuthCode { .. }
                | SportsHubError::ExpiredDraft { .. }
                | SportsHubError::DraftNotPending { .. }
                | SportsHubError::NotFound { .. }
                | SportsHubError::PermissionDenied(_)
                | SportsHubError::Authentication(_)
                | SportsHubError::InvalidInput(_)
                | SportsHubError::RateLimitExceeded
                | SportsHubError::Email(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SportsHubError::Database(_) => ErrorSeverity::Critical,
            SportsHubError::Migration(_) => ErrorSeverity::Critical,
            SportsHubError::Config(_) => ErrorSeverity::Critical,
            SportsHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            SportsHubError::Authentication(_) => ErrorSeverity::Warning,
            SportsHubError::InvalidAuthCode { .. } => ErrorSeverity::Warning,
            SportsHubError::RateLimitExceeded => ErrorSeverity::Warning,
            SportsHubError::CapacityExceeded { .. } => ErrorSeverity::Info,
            SportsHubError::ExpiredDraft { .. } => ErrorSeverity::Info,
            SportsHubError::DraftNotPending { .. } => ErrorSeverity::Info,
            SportsHubError::NotFound { .. } => ErrorSeverity::Info,
            SportsHubError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
