//! CDN upload workflow
//!
//! Takes a processed output directory (hashed files plus `manifest.json`),
//! pushes every asset to storage with long-lived cache headers, then
//! publishes a manifest carrying public URLs.

use crate::client::StorageClient;
use cadcdn_asset::{AssetRecord, Manifest, ManifestBuilder, CDN_MANIFEST_FILE, MANIFEST_FILE};
use cadcdn_core::{CacheConfig, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Remote key of the published manifest
pub const MANIFEST_KEY: &str = "manifest.json";

/// Remote key for an asset: the URDF sits at the root, everything else under `assets/`
pub fn remote_key(record: &AssetRecord) -> String {
    if record.is_document() {
        record.processed_name.clone()
    } else {
        format!("assets/{}", record.processed_name)
    }
}

/// One successfully uploaded asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub original: String,
    pub key: String,
    pub url: String,
}

/// Running totals for an uploader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub uploaded_count: usize,
    pub total_size: u64,
}

/// Outcome of [`upload_processed`]
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub uploaded: Vec<UploadedAsset>,
    /// Keys whose local file was missing
    pub skipped: Vec<String>,
    pub total_size: u64,
    pub manifest_url: String,
    pub cdn_manifest_path: PathBuf,
}

/// Uploads assets through a [`StorageClient`] and tracks totals
pub struct CdnUploader<S: StorageClient> {
    storage: S,
    public_url: String,
    cache: CacheConfig,
    uploaded_count: usize,
    total_size: u64,
}

impl<S: StorageClient> CdnUploader<S> {
    pub fn new(storage: S, public_url: impl Into<String>, cache: CacheConfig) -> Self {
        let public_url = public_url.into().trim_end_matches('/').to_string();
        Self {
            storage,
            public_url,
            cache,
            uploaded_count: 0,
            total_size: 0,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Public URL for a remote key
    pub fn cdn_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    pub fn stats(&self) -> UploadStats {
        UploadStats {
            uploaded_count: self.uploaded_count,
            total_size: self.total_size,
        }
    }

    /// Upload one processed file with the asset cache policy
    pub fn upload_asset(&mut self, local_path: &Path, record: &AssetRecord) -> Result<UploadedAsset> {
        let key = remote_key(record);
        self.storage.upload_file(
            local_path,
            &key,
            &record.media_type,
            &self.cache.asset_cache_control(),
        )?;
        self.uploaded_count += 1;
        self.total_size += record.size_bytes;

        let url = self.cdn_url(&key);
        info!(file = %record.original_name, key = %key, "Uploaded asset");
        Ok(UploadedAsset {
            original: record.original_name.clone(),
            key,
            url,
        })
    }

    /// Upload manifest JSON with the short manifest cache policy, returning its URL
    pub fn upload_manifest(&mut self, content: &[u8]) -> Result<String> {
        self.storage.upload_bytes(
            content,
            MANIFEST_KEY,
            "application/json",
            &self.cache.manifest_cache_control(),
        )?;
        Ok(self.cdn_url(MANIFEST_KEY))
    }
}

/// Publish a processed directory.
///
/// Meshes go up first so the URDF and manifest never reference objects that
/// are not yet live. Files listed in the manifest but missing on disk are
/// skipped with a warning; storage errors abort the run.
pub fn upload_processed<S: StorageClient>(
    uploader: &mut CdnUploader<S>,
    processed_dir: &Path,
    builder: &ManifestBuilder,
) -> Result<UploadReport> {
    let manifest = Manifest::load(&processed_dir.join(MANIFEST_FILE))?;
    info!(
        assets = manifest.assets.len(),
        backend = uploader.storage().name(),
        "Uploading processed assets"
    );

    let mut report = UploadReport::default();
    let ordered = manifest
        .non_documents()
        .chain(manifest.document())
        .map(|asset| &asset.record);

    for record in ordered {
        let local_path = processed_dir.join(&record.processed_name);
        if !local_path.exists() {
            warn!(file = %local_path.display(), "Processed file missing, skipping");
            report.skipped.push(remote_key(record));
            continue;
        }
        report.uploaded.push(uploader.upload_asset(&local_path, record)?);
    }

    let cdn_manifest = ManifestBuilder::overlay_urls(&manifest, uploader.public_url());
    let cdn_manifest_path = processed_dir.join(CDN_MANIFEST_FILE);
    builder.write(&cdn_manifest, &cdn_manifest_path)?;
    report.manifest_url = uploader.upload_manifest(&builder.serialize(&cdn_manifest)?)?;

    report.total_size = uploader.stats().total_size;
    report.cdn_manifest_path = cdn_manifest_path;
    info!(
        uploaded = report.uploaded.len(),
        skipped = report.skipped.len(),
        manifest = %report.manifest_url,
        "Upload complete"
    );
    Ok(report)
}
