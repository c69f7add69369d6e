//! Blob store adapter: the narrow `get(path) -> bytes` / `put(path, bytes) -> uri`
//! boundary the core treats every object store implementation behind.

use std::path::Path;

use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub prefix: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: std::env::var("DDC_BLOB_BUCKET").unwrap_or_else(|_| "drawing-diff-core".to_string()),
            region: std::env::var("DDC_BLOB_REGION").unwrap_or_else(|_| "us-west-2".to_string()),
            endpoint: std::env::var("DDC_BLOB_ENDPOINT").ok(),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            prefix: String::new(),
        }
    }
}

/// `get(path) -> bytes`, `put(path, bytes) -> uri` — the blob store boundary contract.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, path: &str, data: &[u8]) -> StorageResult<String>;
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>>;
    async fn exists(&self, path: &str) -> StorageResult<bool>;
    async fn delete(&self, path: &str) -> StorageResult<()>;
}

pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3ObjectStorage {
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "ddc-storage",
        );
        let region = Region::new(config.region.clone());
        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(region)
            .behavior_version_latest();
        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket,
            prefix: config.prefix,
        })
    }

    fn full_key(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}{}", self.prefix, path)
        }
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(&self, path: &str, data: &[u8]) -> StorageResult<String> {
        let key = self.full_key(path);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;
        Ok(format!("s3://{}/{}", self.bucket, key))
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let key = self.full_key(path);
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::NotFound(key.clone())
                } else {
                    StorageError::S3Error(e.to_string())
                }
            })?;
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let key = self.full_key(path);
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("NotFound") => Ok(false),
            Err(e) => Err(StorageError::S3Error(e.to_string())),
        }
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let key = self.full_key(path);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;
        Ok(())
    }
}

/// On-disk blob store used by tests and the standalone CLI when no S3
/// endpoint is configured.
pub struct LocalObjectStorage {
    root: std::path::PathBuf,
}

impl LocalObjectStorage {
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn full_path(&self, path: &str) -> std::path::PathBuf {
        self.root.join(path)
    }
}

#[async_trait::async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, path: &str, data: &[u8]) -> StorageResult<String> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data).await?;
        Ok(format!("file://{}", full.display()))
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.full_path(path);
        tokio::fs::read(&full)
            .await
            .map_err(|_| StorageError::NotFound(path.to_string()))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(tokio::fs::try_exists(self.full_path(path)).await?)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full = self.full_path(path);
        if tokio::fs::try_exists(&full).await? {
            tokio::fs::remove_file(&full).await?;
        }
        Ok(())
    }
}

/// Builds the fixed blob-store path layout for a page artifact.
#[must_use]
pub fn page_artifact_path(job_id: &str, page_number: u32, artifact: &str) -> String {
    format!("sessions/{job_id}/pages/{page_number:03}/{artifact}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_storage_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path());
        storage.put("sessions/j1/pages/001/old.png", b"hello").await.unwrap();
        assert!(storage.exists("sessions/j1/pages/001/old.png").await.unwrap());
        let data = storage.get("sessions/j1/pages/001/old.png").await.unwrap();
        assert_eq!(data, b"hello");
        storage.delete("sessions/j1/pages/001/old.png").await.unwrap();
        assert!(!storage.exists("sessions/j1/pages/001/old.png").await.unwrap());
    }

    #[test]
    fn artifact_path_is_zero_padded() {
        assert_eq!(
            page_artifact_path("job-1", 7, "overlay.png"),
            "sessions/job-1/pages/007/overlay.png"
        );
    }
}
