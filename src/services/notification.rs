//! Notification service implementation
//!
//! Transactional email through the Brevo REST API: verification codes and
//! event reminders. Templates use `{placeholder}` substitution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use crate::config::settings::EmailConfig;
use crate::models::Event;
use crate::utils::errors::{EmailError, EmailResult};
use crate::utils::helpers::truncate_text;
use crate::utils::logging::log_collaborator_failure;

const VERIFICATION_SUBJECT: &str = "Código de verificación - Puntarenas Se Mueve";

const VERIFICATION_TEMPLATE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="UTF-8"></head>
<body style="font-family: 'Segoe UI', Tahoma, sans-serif; background: #f4f4f4; padding: 20px;">
  <div style="max-width: 500px; margin: 0 auto; background: white; border-radius: 12px; padding: 30px;">
    <h1 style="color: #2563eb; text-align: center;">Puntarenas Se Mueve</h1>
    <p style="text-align: center;">Tu código de verificación es:</p>
    <div style="font-size: 32px; letter-spacing: 8px; text-align: center; font-weight: bold;">{code}</div>
    <p style="text-align: center;">Ingresa este código en la aplicación para verificar tu correo electrónico.</p>
    <p style="text-align: center; color: #f59e0b;">Este código expira en {ttl_minutes} minutos.</p>
    <p style="text-align: center; font-size: 12px; color: #94a3b8;">Si no solicitaste este código, ignora este mensaje.<br>&copy; {year} Puntarenas Se Mueve - Municipalidad de Puntarenas</p>
  </div>
</body></html>"#;

const REMINDER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="UTF-8"></head>
<body style="font-family: 'Segoe UI', Tahoma, sans-serif; background: #f4f4f4; padding: 20px;">
  <div style="max-width: 550px; margin: 0 auto; background: white; border-radius: 12px; padding: 30px;">
    <h1 style="color: #2563eb; text-align: center;">Puntarenas Se Mueve</h1>
    <p>Hola <strong>{user_name}</strong>,</p>
    <p>Te recordamos que tienes un evento próximo:</p>
    <div style="border-left: 4px solid #2563eb; padding: 20px; background: #f0f9ff;">
      <div style="font-size: 20px; font-weight: bold;">{event_name}</div>
      <div>Fecha: <strong>{event_date}</strong></div>
      <div>Hora: <strong>{event_time}</strong></div>
      <div>Lugar: <strong>{event_venue}</strong></div>
    </div>
    <div style="text-align: center; background: #fef3c7; padding: 15px;">
      <div style="font-size: 36px; font-weight: bold;">{days_ahead}</div>
      <div>{days_word} para el evento</div>
    </div>
    <p style="text-align: center; font-size: 12px; color: #94a3b8;">&copy; {year} Puntarenas Se Mueve</p>
  </div>
</body></html>"#;

/// Per-recipient values for a reminder email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderFields {
    pub user_name: String,
    pub event_name: String,
    pub event_date: String,
    pub event_time: String,
    pub event_venue: String,
    pub days_ahead: u32,
}

impl ReminderFields {
    pub fn for_event(event: &Event, venue_name: &str, user_name: &str, days_ahead: u32) -> Self {
        Self {
            user_name: user_name.to_string(),
            event_name: event.name.clone(),
            event_date: event.start_date.format("%d/%m/%Y").to_string(),
            event_time: format!(
                "{} - {}",
                event.start_time.format("%H:%M"),
                event.end_time.format("%H:%M")
            ),
            event_venue: venue_name.to_string(),
            days_ahead,
        }
    }

    fn days_word(&self) -> &'static str {
        if self.days_ahead == 1 { "día" } else { "días" }
    }

    pub fn subject(&self) -> String {
        format!("Recordatorio: {} en {} {}", self.event_name, self.days_ahead, self.days_word())
    }
}

/// Transactional email collaborator
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_verification_code(&self, email: &str, code: &str) -> EmailResult<()>;

    async fn send_event_reminder(&self, email: &str, fields: &ReminderFields) -> EmailResult<()>;
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(rename = "messageId")]
    message_id: Option<String>,
}

/// Brevo (`/smtp/email`) client
#[derive(Clone, Debug)]
pub struct BrevoEmailSender {
    client: Client,
    config: EmailConfig,
    verification_ttl_minutes: i64,
}

impl BrevoEmailSender {
    pub fn new(config: EmailConfig, verification_ttl_minutes: i64) -> EmailResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("SportsHub/1.0")
            .build()
            .map_err(|e| EmailError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            verification_ttl_minutes,
        })
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> EmailResult<()> {
        if self.config.api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let body = json!({
            "sender": { "name": self.config.sender_name, "email": self.config.sender_email },
            "to": [{ "email": to }],
            "subject": subject,
            "htmlContent": html,
        });

        let response = self
            .client
            .post(format!("{}/smtp/email", self.config.api_url.trim_end_matches('/')))
            .header("api-key", &self.config.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmailError::Timeout
                } else {
                    EmailError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmailError::RequestFailed(format!("HTTP {}: {}", status, truncate_text(&error_text, 300))));
        }

        let sent: SendResponse = response.json().await.unwrap_or(SendResponse { message_id: None });
        debug!(to = to, message_id = sent.message_id.as_deref(), "Email accepted by Brevo");
        Ok(())
    }
}

#[async_trait]
impl EmailSender for BrevoEmailSender {
    async fn send_verification_code(&self, email: &str, code: &str) -> EmailResult<()> {
        let mut parameters = HashMap::new();
        parameters.insert("code", code.to_string());
        parameters.insert("ttl_minutes", self.verification_ttl_minutes.to_string());
        parameters.insert("year", Utc::now().year().to_string());

        self.send(email, VERIFICATION_SUBJECT, render(VERIFICATION_TEMPLATE, &parameters)).await?;
        info!(email = email, "Verification code sent");
        Ok(())
    }

    async fn send_event_reminder(&self, email: &str, fields: &ReminderFields) -> EmailResult<()> {
        let mut parameters = HashMap::new();
        parameters.insert("user_name", fields.user_name.clone());
        parameters.insert("event_name", fields.event_name.clone());
        parameters.insert("event_date", fields.event_date.clone());
        parameters.insert("event_time", fields.event_time.clone());
        parameters.insert("event_venue", fields.event_venue.clone());
        parameters.insert("days_ahead", fields.days_ahead.to_string());
        parameters.insert("days_word", fields.days_word().to_string());
        parameters.insert("year", Utc::now().year().to_string());

        self.send(email, &fields.subject(), render(REMINDER_TEMPLATE, &parameters)).await?;
        info!(email = email, event = %fields.event_name, "Event reminder sent");
        Ok(())
    }
}

/// Substitute `{key}` placeholders with HTML-escaped values
pub fn render(template: &str, parameters: &HashMap<&str, String>) -> String {
    let mut formatted = template.to_string();
    for (key, value) in parameters {
        let placeholder = format!("{{{}}}", key);
        formatted = formatted.replace(&placeholder, &escape_html(value));
    }
    formatted
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Someone to remind about an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

/// Outcome of a reminder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
}

/// Fans reminders out to recipients; individual failures are logged, not raised
#[derive(Clone)]
pub struct NotificationService {
    sender: Arc<dyn EmailSender>,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }

    pub async fn remind(
        &self,
        event: &Event,
        venue_name: &str,
        recipients: &[Recipient],
        days_ahead: u32,
    ) -> NotificationStats {
        let mut stats = NotificationStats::default();

        for recipient in recipients {
            let fields = ReminderFields::for_event(event, venue_name, &recipient.name, days_ahead);
            match self.sender.send_event_reminder(&recipient.email, &fields).await {
                Ok(()) => stats.total_sent += 1,
                Err(e) => {
                    stats.total_failed += 1;
                    log_collaborator_failure("email", &e.to_string(), Some(&recipient.email));
                }
            }
        }

        info!(
            event_id = event.id,
            sent = stats.total_sent,
            failed = stats.total_failed,
            "Event reminders dispatched"
        );
        stats
    }
}
