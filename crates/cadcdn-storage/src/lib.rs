//! cadcdn Storage - Upload processed assets to object storage
//!
//! Provides a small `StorageClient` capability with an S3-compatible
//! Cloudflare R2 backend and a local filesystem backend, plus the upload
//! workflow that publishes a processed directory with cache-control headers.

pub mod backends;
mod client;
mod uploader;

pub use backends::filesystem::{FilesystemStorage, StoredObject};
pub use backends::r2::R2StorageClient;
pub use client::StorageClient;
pub use uploader::{
    remote_key, upload_processed, CdnUploader, UploadReport, UploadStats, UploadedAsset,
    MANIFEST_KEY,
};
