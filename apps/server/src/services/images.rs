//! Product image storage.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use chrono::Utc;
use uuid::Uuid;

use crate::config::SupabaseConfig;

/// An image received in a product form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the client.
    pub file_name: String,
    /// MIME type, always `image/*`.
    pub content_type: String,
    /// File contents.
    pub data: Bytes,
}

impl ImageUpload {
    /// File extension for the stored object: the client file name's
    /// extension, falling back to the MIME subtype.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .or_else(|| self.content_type.strip_prefix("image/"))
            .unwrap_or("img")
            .to_ascii_lowercase()
    }

    /// Unique object name, `<unix millis>-<uuid>.<ext>`.
    pub fn object_name(&self) -> String {
        format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            self.extension()
        )
    }
}

/// Errors from the image store.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// No image store is configured.
    #[error("Image storage is not configured")]
    Disabled,

    /// The request could not be sent.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with an error status.
    #[error("Upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Object storage for product images.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Stores `upload` under `object_name` and returns its public URL.
    async fn upload(&self, object_name: &str, upload: &ImageUpload) -> Result<String, ImageError>;
}

/// Supabase Storage over its REST API.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseStorage {
    /// Creates a client for the configured project and bucket.
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn object_url(&self, object_name: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url, self.config.bucket, object_name
        )
    }

    /// Public URL of an object in the bucket.
    pub fn public_url(&self, object_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url, self.config.bucket, object_name
        )
    }
}

#[async_trait]
impl ImageStorage for SupabaseStorage {
    async fn upload(&self, object_name: &str, upload: &ImageUpload) -> Result<String, ImageError> {
        let response = self
            .client
            .post(self.object_url(object_name))
            .bearer_auth(&self.config.anon_key)
            .header("apikey", &self.config.anon_key)
            .header(CONTENT_TYPE, &upload.content_type)
            .body(upload.data.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(self.public_url(object_name))
    }
}

/// Storage used when no object store is configured. Every upload fails, so
/// products are saved without images.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStorage;

#[async_trait]
impl ImageStorage for DisabledStorage {
    async fn upload(&self, _object_name: &str, _upload: &ImageUpload) -> Result<String, ImageError> {
        Err(ImageError::Disabled)
    }
}

/// Builds the image store for the configuration.
pub fn storage_from_config(supabase: Option<&SupabaseConfig>) -> Arc<dyn ImageStorage> {
    match supabase {
        Some(config) => Arc::new(SupabaseStorage::new(config.clone())),
        None => {
            tracing::warn!("SUPABASE_URL/SUPABASE_ANON_KEY not set, product images will not be stored");
            Arc::new(DisabledStorage)
        }
    }
}

/// Uploads every image in order and returns the URLs of those that were
/// stored. Failures are logged and skipped.
pub async fn upload_all(storage: &dyn ImageStorage, uploads: Vec<ImageUpload>) -> Vec<String> {
    let mut urls = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let object_name = upload.object_name();
        match storage.upload(&object_name, &upload).await {
            Ok(url) => urls.push(url),
            Err(e) => tracing::warn!(
                file_name = %upload.file_name,
                error = %e,
                "Image upload failed, skipping"
            ),
        }
    }
    urls
}
