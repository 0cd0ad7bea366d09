//! Fake SaaS collaborators recording what they were asked to do

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use SportsHub::models::IdentityRecord;
use SportsHub::services::identity::IdentityLookup;
use SportsHub::services::notification::{EmailSender, ReminderFields};
use SportsHub::services::storage::ObjectStorage;
use SportsHub::utils::errors::{EmailError, EmailResult, StorageError, StorageResult};

#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<String>>,
    pub copied_urls: Mutex<Vec<String>>,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl FakeStorage {
    pub fn fail_uploads(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Make every upload take `ms` milliseconds, like a real network call
    pub fn slow_uploads(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    async fn wait(&self) {
        let ms = self.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    pub fn upload_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn store(&self, bytes: &[u8], name: &str) -> StorageResult<String> {
        self.wait().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Timeout);
        }
        assert!(!bytes.is_empty());
        self.uploads.lock().unwrap().push(name.to_string());
        Ok(format!("https://img.test/{}.png", name))
    }

    async fn store_from_url(&self, url: &str) -> StorageResult<String> {
        self.wait().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("remote fetch failed".to_string()));
        }
        self.copied_urls.lock().unwrap().push(url.to_string());
        Ok("https://img.test/copied.png".to_string())
    }
}

#[derive(Default)]
pub struct FakeEmailSender {
    pub codes: Mutex<Vec<(String, String)>>,
    pub reminders: Mutex<Vec<(String, ReminderFields)>>,
    failing_addresses: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
}

impl FakeEmailSender {
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn fail_for(&self, email: &str) {
        self.failing_addresses.lock().unwrap().insert(email.to_string());
    }

    /// Most recent code sent to `email`
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.codes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    fn check(&self, email: &str) -> EmailResult<()> {
        if self.fail_all.load(Ordering::SeqCst) || self.failing_addresses.lock().unwrap().contains(email) {
            return Err(EmailError::RequestFailed("HTTP 503".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EmailSender for FakeEmailSender {
    async fn send_verification_code(&self, email: &str, code: &str) -> EmailResult<()> {
        self.check(email)?;
        self.codes.lock().unwrap().push((email.to_string(), code.to_string()));
        Ok(())
    }

    async fn send_event_reminder(&self, email: &str, fields: &ReminderFields) -> EmailResult<()> {
        self.check(email)?;
        self.reminders.lock().unwrap().push((email.to_string(), fields.clone()));
        Ok(())
    }
}

/// Answers every well-formed ID with the same person
#[derive(Default)]
pub struct FakeIdentityLookup {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityLookup for FakeIdentityLookup {
    async fn lookup(&self, national_id: &str) -> IdentityRecord {
        self.calls.fetch_add(1, Ordering::SeqCst);
        IdentityRecord {
            national_id: national_id.to_string(),
            valid: true,
            ..Default::default()
        }
        .with_full_name("MARIA JOSE SOLIS MORA")
    }
}
