use super::errors::ConnectorError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Bucket/key addressed blob storage holding uploaded spreadsheets and the
/// generated price sheets.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ConnectorError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ConnectorError>;
}

/// Object store backed by a directory: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an object path, refusing anything that would leave the root.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ConnectorError> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(ConnectorError::Internal(format!("invalid bucket name {:?}", bucket)));
        }

        let key_path = Path::new(key);
        let is_plain = !key.is_empty()
            && key_path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(ConnectorError::Internal(format!("invalid object key {:?}", key)));
        }

        Ok(self.root.join(bucket).join(key_path))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[tracing::instrument(name = "Read object.", skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ConnectorError> {
        let path = self.object_path(bucket, key)?;
        tokio::fs::read(&path).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                ConnectorError::NotFound(format!("{}/{}", bucket, key))
            }
            _ => ConnectorError::from(err),
        })
    }

    #[tracing::instrument(name = "Write object.", skip(self, body), fields(size = body.len()))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ConnectorError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;
        tracing::info!(path = %path.display(), "Object stored");
        Ok(())
    }
}
