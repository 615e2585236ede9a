//! Storage client trait

use cadcdn_core::Result;
use std::path::Path;

/// The upload capability the CDN workflow needs from a storage backend.
///
/// Implemented by [`R2StorageClient`](crate::R2StorageClient) and
/// [`FilesystemStorage`](crate::FilesystemStorage).
pub trait StorageClient: Send + Sync {
    /// Short backend name for logs (e.g. "r2", "filesystem")
    fn name(&self) -> &str;

    /// Upload a local file under `remote_key`
    fn upload_file(
        &self,
        local_path: &Path,
        remote_key: &str,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    /// Upload in-memory content under `remote_key`
    fn upload_bytes(
        &self,
        content: &[u8],
        remote_key: &str,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;
}
