//! Object storage for uploaded COA documents.
//!
//! Two backends: a directory on local disk and the Supabase storage REST API.
//! Object paths are always relative keys such as `tenant/1700000000000-coa.pdf`.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage service returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage misconfigured: {0}")]
    Configuration(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone)]
pub enum ObjectStorageConfig {
    Local {
        root: PathBuf,
        bucket: String,
        public_base_url: String,
    },
    Supabase {
        base_url: String,
        service_role_key: String,
        bucket: String,
        timeout: Duration,
    },
}

#[derive(Debug, Clone)]
pub enum ObjectStorage {
    Local(LocalStorage),
    Supabase(SupabaseStorage),
}

impl ObjectStorage {
    pub fn from_config(config: ObjectStorageConfig) -> StorageResult<Self> {
        match config {
            ObjectStorageConfig::Local { root, bucket, public_base_url } => {
                Ok(Self::Local(LocalStorage::new(root, bucket, public_base_url)))
            }
            ObjectStorageConfig::Supabase { base_url, service_role_key, bucket, timeout } => {
                SupabaseStorage::new(&base_url, service_role_key, bucket, timeout).map(Self::Supabase)
            }
        }
    }

    pub fn bucket(&self) -> &str {
        match self {
            Self::Local(local) => &local.bucket,
            Self::Supabase(remote) => &remote.bucket,
        }
    }

    /// Store `bytes` under `path`, replacing nothing: an existing object is an error.
    pub async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_object_path(path)?;
        match self {
            Self::Local(local) => local.put(path, &bytes).await,
            Self::Supabase(remote) => remote.put(path, bytes, content_type).await,
        }
    }

    /// Remove an object; removing an absent object succeeds.
    pub async fn remove(&self, path: &str) -> StorageResult<()> {
        validate_object_path(path)?;
        match self {
            Self::Local(local) => local.remove(path).await,
            Self::Supabase(remote) => remote.remove(path).await,
        }
    }

    pub fn public_url(&self, path: &str) -> StorageResult<String> {
        validate_object_path(path)?;
        match self {
            Self::Local(local) => Ok(local.public_url(path)),
            Self::Supabase(remote) => remote.public_url(path),
        }
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        match self {
            Self::Local(local) => local.health_check().await,
            Self::Supabase(remote) => remote.health_check().await,
        }
    }
}

/// Only plain relative segments: no `..`, no root, no drive prefix.
fn validate_object_path(path: &str) -> StorageResult<()> {
    if path.is_empty() || path.contains('\\') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    let clean = Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !clean {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Directory that holds this bucket's objects
    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        let target = self.bucket_dir().join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::try_exists(&target).await? {
            return Err(StorageError::Http {
                status: StatusCode::CONFLICT.as_u16(),
                message: format!("Object {} already exists", path),
            });
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.bucket_dir().join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            path
        )
    }

    async fn health_check(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(self.bucket_dir()).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: Url,
    service_role_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        base_url: &str,
        service_role_key: String,
        bucket: String,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StorageError::Configuration(format!("Invalid storage URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::Configuration(format!(
                "Storage URL {} cannot be a base",
                base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            service_role_key,
            bucket,
        })
    }

    fn endpoint(&self, prefix: &[&str], path: Option<&str>) -> StorageResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::Configuration("Storage URL cannot be a base".to_string()))?;
            segments.pop_if_empty();
            segments.extend(prefix);
            segments.push(&self.bucket);
            if let Some(path) = path {
                segments.extend(path.split('/'));
            }
        }
        Ok(url)
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let url = self.endpoint(&["storage", "v1", "object"], Some(path))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_role_key)
            .header("apikey", &self.service_role_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        check_status(response).await
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        let url = self.endpoint(&["storage", "v1", "object"], None)?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.service_role_key)
            .header("apikey", &self.service_role_key)
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await?;

        // Missing objects come back as an empty list, not an error
        check_status(response).await
    }

    fn public_url(&self, path: &str) -> StorageResult<String> {
        self.endpoint(&["storage", "v1", "object", "public"], Some(path))
            .map(String::from)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let url = self.endpoint(&["storage", "v1", "bucket"], None)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.service_role_key)
            .header("apikey", &self.service_role_key)
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> StorageResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), %message, "Storage request rejected");
    Err(StorageError::Http {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local(dir: &TempDir) -> ObjectStorage {
        ObjectStorage::from_config(ObjectStorageConfig::Local {
            root: dir.path().to_path_buf(),
            bucket: "coa-bucket".to_string(),
            public_base_url: "http://localhost:8080/files/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_object_path_validation() {
        assert!(validate_object_path("tenant-a/1700000000000-coa.pdf").is_ok());
        assert!(validate_object_path("").is_err());
        assert!(validate_object_path("../secrets").is_err());
        assert!(validate_object_path("tenant-a/../../etc/passwd").is_err());
        assert!(validate_object_path("/etc/passwd").is_err());
        assert!(validate_object_path("tenant-a\\coa.pdf").is_err());
    }

    #[tokio::test]
    async fn test_local_put_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = local(&dir);

        storage
            .put("tenant-a/1-coa.pdf", b"%PDF-1.4".to_vec(), "application/pdf")
            .await
            .unwrap();
        let stored = dir.path().join("coa-bucket/tenant-a/1-coa.pdf");
        assert_eq!(std::fs::read(&stored).unwrap(), b"%PDF-1.4");

        // Objects are never overwritten
        let duplicate = storage
            .put("tenant-a/1-coa.pdf", b"other".to_vec(), "application/pdf")
            .await;
        assert!(matches!(duplicate, Err(StorageError::Http { status: 409, .. })));

        storage.remove("tenant-a/1-coa.pdf").await.unwrap();
        assert!(!stored.exists());

        // Removing again is not an error
        storage.remove("tenant-a/1-coa.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let storage = local(&dir);

        let result = storage.put("../outside.pdf", b"x".to_vec(), "application/pdf").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_local_health_check_creates_bucket_dir() {
        let dir = TempDir::new().unwrap();
        let storage = local(&dir);

        storage.health_check().await.unwrap();
        assert!(dir.path().join("coa-bucket").is_dir());
    }

    #[test]
    fn test_local_public_url() {
        let dir = TempDir::new().unwrap();
        let storage = local(&dir);

        assert_eq!(
            storage.public_url("tenant-a/1-coa.pdf").unwrap(),
            "http://localhost:8080/files/coa-bucket/tenant-a/1-coa.pdf"
        );
    }

    #[test]
    fn test_supabase_public_url_encodes_segments() {
        let storage = ObjectStorage::from_config(ObjectStorageConfig::Supabase {
            base_url: "https://project.supabase.co".to_string(),
            service_role_key: "service-key".to_string(),
            bucket: "coa-bucket".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        assert_eq!(
            storage.public_url("tenant-a/1-Acme COA.pdf").unwrap(),
            "https://project.supabase.co/storage/v1/object/public/coa-bucket/tenant-a/1-Acme%20COA.pdf"
        );
        assert_eq!(storage.bucket(), "coa-bucket");
    }

    #[test]
    fn test_supabase_rejects_bad_url() {
        let result = ObjectStorage::from_config(ObjectStorageConfig::Supabase {
            base_url: "not a url".to_string(),
            service_role_key: "service-key".to_string(),
            bucket: "coa-bucket".to_string(),
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }
}
