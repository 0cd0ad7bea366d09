//! Email verification codes

use std::sync::Arc;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use crate::config::settings::VerificationConfig;
use crate::database::VerificationCodeStore;
use crate::middleware::RateLimitMiddleware;
use crate::models::NewVerificationCode;
use crate::services::notification::EmailSender;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::{generate_numeric_code, is_valid_email, normalize_email};

const CODE_LENGTH: usize = 6;

#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn VerificationCodeStore>,
    sender: Arc<dyn EmailSender>,
    limiter: RateLimitMiddleware,
    config: VerificationConfig,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn VerificationCodeStore>,
        sender: Arc<dyn EmailSender>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            store,
            sender,
            limiter: RateLimitMiddleware::per_hour(config.sends_per_hour),
            config,
        }
    }

    /// Generate, store and email a fresh code. Delivery failures are returned to the caller.
    pub async fn send_code(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(SportsHubError::InvalidInput(format!("invalid email address: {}", email)));
        }
        self.limiter.check(&email)?;

        let now = Utc::now();
        let stored = self
            .store
            .insert_verification_code(NewVerificationCode {
                email: email.clone(),
                code: generate_numeric_code(CODE_LENGTH),
                created_at: now,
                expires_at: now + Duration::minutes(self.config.ttl_minutes),
            })
            .await?;

        if let Err(e) = self.sender.send_verification_code(&email, &stored.code).await {
            warn!(email = %email, error = %e, "Verification email could not be sent");
            return Err(e.into());
        }

        info!(email = %email, "Verification code issued");
        Ok(())
    }

    /// Consume a code; true exactly once for a valid, unexpired code
    pub async fn verify(&self, email: &str, code: &str) -> Result<bool> {
        let email = normalize_email(email);
        let code = code.trim();
        if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let verified = self.store.consume_verification_code(&email, code, Utc::now()).await?;
        if verified {
            info!(email = %email, "Email verified");
        } else {
            warn!(email = %email, "Verification code rejected");
        }
        Ok(verified)
    }

    /// Remove codes that expired before now
    pub async fn purge_expired(&self) -> Result<u64> {
        let purged = self.store.purge_verification_codes(Utc::now()).await?;
        self.limiter.cleanup();
        Ok(purged)
    }
}
