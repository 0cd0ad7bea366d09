//! Image hosting service
//!
//! Events reference their image by URL. Uploads go to Cloudinary using an
//! unsigned upload preset; the returned `secure_url` is what gets stored.

use std::time::Duration;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use crate::config::settings::StorageConfig;
use crate::utils::errors::{StorageError, StorageResult};
use crate::utils::helpers::truncate_text;

/// Object storage collaborator
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload raw image bytes, returning a public URL
    async fn store(&self, bytes: &[u8], name: &str) -> StorageResult<String>;

    /// Copy a remote image into storage, returning its new public URL
    async fn store_from_url(&self, url: &str) -> StorageResult<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: UploadErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UploadErrorDetail {
    message: String,
}

#[derive(Clone, Debug)]
pub struct CloudinaryStorage {
    client: Client,
    config: StorageConfig,
}

impl CloudinaryStorage {
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("SportsHub/1.0")
            .build()
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.cloud_name.is_empty() && !self.config.upload_preset.is_empty()
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.api_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    async fn upload(&self, file: String, public_id: Option<&str>) -> StorageResult<String> {
        if !self.is_enabled() {
            return Err(StorageError::NotConfigured);
        }

        let mut form = vec![
            ("file", file),
            ("upload_preset", self.config.upload_preset.clone()),
            ("folder", self.config.folder.clone()),
        ];
        if let Some(public_id) = public_id {
            form.push(("public_id", public_id.to_string()));
        }

        let response = self
            .client
            .post(self.upload_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout
                } else {
                    StorageError::UploadFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<UploadErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(StorageError::UploadFailed(format!("HTTP {}: {}", status, truncate_text(&message, 300))));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        uploaded
            .secure_url
            .or(uploaded.url)
            .ok_or_else(|| StorageError::InvalidResponse("response has no URL".to_string()))
    }
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    async fn store(&self, bytes: &[u8], name: &str) -> StorageResult<String> {
        let data_uri = format!("data:{};base64,{}", sniff_image_mime(bytes), STANDARD.encode(bytes));
        debug!(name = name, size = bytes.len(), "Uploading image");

        let url = self.upload(data_uri, Some(name)).await?;
        info!(name = name, url = %url, "Image uploaded");
        Ok(url)
    }

    async fn store_from_url(&self, url: &str) -> StorageResult<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| StorageError::UploadFailed(format!("invalid image URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StorageError::UploadFailed(format!("unsupported scheme: {}", parsed.scheme())));
        }

        let stored = self.upload(parsed.to_string(), None).await?;
        info!(source = url, url = %stored, "Remote image copied");
        Ok(stored)
    }
}

/// Guess an image MIME type from its leading bytes
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_image_mime() {
        assert_eq!(sniff_image_mime(&[0x89, b'P', b'N', b'G', 0x0D]), "image/png");
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8"), "image/webp");
        assert_eq!(sniff_image_mime(b"??"), "image/jpeg");
    }

    #[test]
    fn test_disabled_without_preset() {
        let storage = CloudinaryStorage::new(crate::config::Settings::default().storage).unwrap();
        assert!(!storage.is_enabled());
    }
}
