//! Local directory backend
//!
//! Mirrors object keys into a directory tree. Used for dry runs and tests.

use crate::client::StorageClient;
use cadcdn_core::{CdnError, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// One object written through [`FilesystemStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub cache_control: String,
    pub size: u64,
}

/// Storage client that writes objects under a local root directory
#[derive(Debug)]
pub struct FilesystemStorage {
    root: PathBuf,
    uploads: Mutex<Vec<StoredObject>>,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Objects written so far, in upload order
    pub fn uploads(&self) -> Vec<StoredObject> {
        match self.uploads.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Local path for `key`. Keys must be relative and must not climb out of the root.
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(CdnError::Storage(format!("Invalid object key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn prepare(&self, key: &str) -> Result<PathBuf> {
        let dest = self.object_path(key)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(dest)
    }

    fn record(&self, key: &str, content_type: &str, cache_control: &str, size: u64) {
        let object = StoredObject {
            key: key.to_string(),
            content_type: content_type.to_string(),
            cache_control: cache_control.to_string(),
            size,
        };
        match self.uploads.lock() {
            Ok(mut guard) => guard.push(object),
            Err(poisoned) => poisoned.into_inner().push(object),
        }
    }
}

impl StorageClient for FilesystemStorage {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn upload_file(
        &self,
        local_path: &Path,
        remote_key: &str,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        if !local_path.exists() {
            return Err(CdnError::NotFound(local_path.to_path_buf()));
        }
        let dest = self.prepare(remote_key)?;
        let size = std::fs::copy(local_path, &dest)?;
        self.record(remote_key, content_type, cache_control, size);
        debug!(key = %remote_key, dest = %dest.display(), "Stored file");
        Ok(())
    }

    fn upload_bytes(
        &self,
        content: &[u8],
        remote_key: &str,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        let dest = self.prepare(remote_key)?;
        std::fs::write(&dest, content)?;
        self.record(remote_key, content_type, cache_control, content.len() as u64);
        debug!(key = %remote_key, dest = %dest.display(), "Stored bytes");
        Ok(())
    }
}
