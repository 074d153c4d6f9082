use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Out-of-band storage for extracted post assets.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError>;

    /// Removes one blob. A missing blob is not an error.
    async fn delete(&self, path: &str) -> Result<(), BlobError>;

    /// Removes everything stored under `prefix`. Missing prefixes are not an
    /// error.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), BlobError>;
}

/// Rejects absolute paths and parent traversal.
fn relative_path(path: &str) -> Result<&Path, BlobError> {
    let relative = Path::new(path);
    let clean = !path.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if clean {
        Ok(relative)
    } else {
        Err(BlobError::InvalidPath(path.to_string()))
    }
}

/// Stores blobs as files below a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let target = self.root.join(relative_path(path)?);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        let target = self.root.join(relative_path(path)?);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), BlobError> {
        let target = self.root.join(relative_path(prefix)?);
        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError> {
        relative_path(path)?;
        self.blobs
            .write()
            .await
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        relative_path(path)?;
        self.blobs.write().await.remove(path);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), BlobError> {
        relative_path(prefix)?;
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        self.blobs
            .write()
            .await
            .retain(|path, _| !path.starts_with(&dir));
        Ok(())
    }
}
