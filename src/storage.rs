//! Object storage for screenshots
//!
//! [`ObjectStore`] is the narrow contract the capture step depends on.
//! [`HttpObjectStore`] implements it against any S3/R2-style endpoint that
//! accepts `PUT <endpoint>/<bucket>/<key>` with a bearer token.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::error::Error as CrateError;

/// Default timeout for storage requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Local file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request could not be sent
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage service answered with a non-success status
    #[error("Upload of {key} failed with status {status}: {body}")]
    Upload {
        key: String,
        status: u16,
        body: String,
    },

    /// Storage is not configured
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StorageError> for CrateError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => CrateError::Io(e),
            StorageError::Http(e) => CrateError::Http(e),
            _ => CrateError::Storage(err.to_string()),
        }
    }
}

/// Storage collaborator used by the capture step
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under `key` and return its public URL
    async fn upload_file(&self, local_path: &Path, key: &str) -> Result<String, StorageError>;

    /// Produce a thumbnail URL for the uploaded image of `url`
    async fn generate_thumbnail(&self, url: &str, key: &str) -> Result<String, StorageError>;
}

/// Connection settings for [`HttpObjectStore`]
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Base endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    pub endpoint: String,

    /// Bucket name, appended to the endpoint
    pub bucket: String,

    /// Bearer token sent with uploads
    pub token: Option<String>,

    /// Base URL objects are publicly served from
    pub public_url: String,

    /// Thumbnail URL template with `{url}` and `{key}` placeholders
    pub thumbnail_template: Option<String>,
}

/// Object store speaking plain HTTP PUT
#[derive(Clone)]
pub struct HttpObjectStore {
    client: ReqwestClient,
    config: StorageConfig,
}

impl HttpObjectStore {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        if config.endpoint.trim().is_empty() {
            return Err(StorageError::Config("storage endpoint is not set".to_string()));
        }
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    fn object_url(&self, key: &str) -> String {
        join_url(
            &join_url(&self.config.endpoint, &self.config.bucket),
            key,
        )
    }

    fn public_url(&self, key: &str) -> String {
        let base = if self.config.public_url.is_empty() {
            join_url(&self.config.endpoint, &self.config.bucket)
        } else {
            self.config.public_url.clone()
        };
        join_url(&base, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self, local_path), fields(path = %local_path.display()))]
    async fn upload_file(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
        let bytes = tokio::fs::read(local_path).await?;
        debug!("Uploading {} bytes to {}", bytes.len(), key);

        let mut request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, "image/png")
            .body(bytes);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                key: key.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let public_url = self.public_url(key);
        info!("Uploaded screenshot to {}", public_url);
        Ok(public_url)
    }

    async fn generate_thumbnail(&self, url: &str, key: &str) -> Result<String, StorageError> {
        Ok(match &self.config.thumbnail_template {
            Some(template) => template.replace("{url}", url).replace("{key}", key),
            None => self.public_url(key),
        })
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
