use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::config::SupabaseConfig;

/// Object storage holding generated exports.
#[async_trait]
pub trait ExportStorage: Send + Sync {
    async fn upload(&self, path: &str, body: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// URL granting read access to `path` for `ttl`.
    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError>;

    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage rejected {operation} for {path}: {status} {message}")]
    Rejected {
        operation: &'static str,
        path: String,
        status: u16,
        message: String,
    },
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object path '{0}'")]
    InvalidPath(String),
}

/// Supabase Storage over its REST API, authenticated with the service key.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorage {
    pub fn new(config: &SupabaseConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    async fn ensure_success(
        operation: &'static str,
        path: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            operation,
            path: path.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ExportStorage for SupabaseStorage {
    async fn upload(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .authorized(self.client.post(self.object_url(path)))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(body)
            .send()
            .await?;
        Self::ensure_success("upload", path, response).await?;
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, path
        );
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await?;
        let signed: SignedUrlResponse = Self::ensure_success("sign", path, response)
            .await?
            .json()
            .await?;
        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.delete(url))
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;
        Self::ensure_success("remove", path, response).await?;
        Ok(())
    }
}

/// Writes exports under `<root>/<bucket>/<path>`. Used for local runs and the CLI.
#[derive(Debug, Clone)]
pub struct LocalExportStorage {
    root: PathBuf,
}

impl LocalExportStorage {
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            root: root.into().join(bucket),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|component| {
            !matches!(component, std::path::Component::Normal(_))
        });
        if path.is_empty() || escapes {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ExportStorage for LocalExportStorage {
    async fn upload(
        &self,
        path: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, body).await?;
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if !tokio::fs::try_exists(&target).await? {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} has not been uploaded", target.display()),
            )));
        }
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(ttl_secs);
        Ok(format!("file://{}?expires={expires}", target.display()))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
