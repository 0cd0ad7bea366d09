//! Middleware module
//!
//! Request-level guards shared by the services

pub mod auth;
pub mod rate_limit;

// Re-export commonly used middleware
pub use auth::{can, require, Action, Resource, ApiKeyGuard};
pub use rate_limit::RateLimitMiddleware;
