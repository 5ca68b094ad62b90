use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Write options passed along with every blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    pub public_access: bool,
    pub add_random_suffix: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            public_access: true,
            add_random_suffix: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub path: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob '{0}' already exists")]
    AlreadyExists(String),
    #[error("blob path '{0}' is not allowed")]
    InvalidPath(String),
    #[error("private blobs are not supported by this store")]
    PrivateAccessUnsupported,
    #[error("blob storage failed: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// External storage the upload relay writes document bytes to.
#[async_trait]
pub trait BlobStore: Debug + Send + Sync {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: PutOptions,
    ) -> Result<StoredBlob, BlobStoreError>;
}

/// Stores blobs as files below a root directory and addresses them through a
/// public base URL.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into();
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BlobStoreError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(BlobStoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: PutOptions,
    ) -> Result<StoredBlob, BlobStoreError> {
        if !options.public_access {
            return Err(BlobStoreError::PrivateAccessUnsupported);
        }

        let path = if options.add_random_suffix {
            with_random_suffix(path)
        } else {
            path.to_string()
        };
        let target = self.resolve(&path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(BlobStoreError::AlreadyExists(path));
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(&bytes).await?;
        file.flush().await?;

        let url = format!("{}/{}", self.public_base_url, path);
        Ok(StoredBlob { path, url })
    }
}

/// In-process store for tests and the CLI demo.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    base_url: String,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            blobs: Arc::default(),
            base_url: base_url.into(),
        }
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .ok()
            .and_then(|guard| guard.get(path).cloned())
    }

    pub fn paths(&self) -> Vec<String> {
        self.blobs
            .lock()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: PutOptions,
    ) -> Result<StoredBlob, BlobStoreError> {
        let path = if options.add_random_suffix {
            with_random_suffix(path)
        } else {
            path.to_string()
        };

        let mut guard = self
            .blobs
            .lock()
            .map_err(|_| BlobStoreError::Backend("blob map poisoned".to_string()))?;
        if guard.contains_key(&path) {
            return Err(BlobStoreError::AlreadyExists(path));
        }
        guard.insert(path.clone(), bytes);

        let url = if self.base_url.is_empty() {
            format!("memory://{path}")
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path)
        };
        Ok(StoredBlob { path, url })
    }
}

fn with_random_suffix(path: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    match path.rsplit_once('.') {
        Some((stem, extension)) if !stem.ends_with('/') && !extension.contains('/') => {
            format!("{stem}-{suffix}.{extension}")
        }
        _ => format!("{path}-{suffix}"),
    }
}
