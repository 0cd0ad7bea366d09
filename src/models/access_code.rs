//! Administrator access codes and email verification codes

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::helpers::{remaining_until, RemainingTime};

/// Reusable code that lets the automation engine act on an administrator's behalf
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuthorizationCode {
    pub id: i64,
    pub code: String,
    pub admin_id: i64,
    pub active: bool,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AuthorizationCode {
    /// Active and not yet expired
    pub fn is_vigent(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<RemainingTime> {
        if !self.active {
            return None;
        }
        remaining_until(self.expires_at, now)
    }
}

/// What an administrator sees after issuing or fetching a code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub remaining: RemainingTime,
}

#[derive(Debug, Clone)]
pub struct NewAuthorizationCode {
    pub code: String,
    pub admin_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Single-use code proving ownership of an email address
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailVerificationCode {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EmailVerificationCode {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewVerificationCode {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
