//! Upload command

use anyhow::{Context, Result};
use cadcdn_asset::{human_size, ManifestBuilder};
use cadcdn_core::CdnConfig;
use cadcdn_storage::{
    upload_processed, CdnUploader, FilesystemStorage, R2StorageClient, StorageClient, UploadReport,
};
use std::path::Path;

pub fn run(root: &str, to_dir: Option<&str>) -> Result<()> {
    let root = Path::new(root);
    let config = CdnConfig::load(root).context("Failed to load configuration")?;
    let processed_dir = root.join(&config.processing.output_dir);
    let builder = ManifestBuilder::from_config(&config.processing);

    if !processed_dir.is_dir() {
        anyhow::bail!(
            "Processed directory not found: {} (run `cadcdn process` first)",
            processed_dir.display()
        );
    }

    let report = match to_dir {
        Some(dir) => {
            println!("Copying to {} (dry run)", dir);
            let storage = FilesystemStorage::new(dir);
            publish(storage, &config.r2.public_url, &config, &processed_dir, &builder)?
        }
        None => {
            let r2 = config.require_r2()?;
            let client = R2StorageClient::new(r2).context("Failed to create R2 client")?;
            println!("Uploading to R2 bucket {}", client.bucket());
            publish(client, &r2.public_url, &config, &processed_dir, &builder)?
        }
    };

    println!("Uploaded {} asset(s), {}", report.uploaded.len(), human_size(report.total_size));
    for asset in &report.uploaded {
        println!("  {} -> {}", asset.original, asset.url);
    }
    if !report.skipped.is_empty() {
        println!("Skipped {} missing file(s):", report.skipped.len());
        for key in &report.skipped {
            println!("  {}", key);
        }
    }
    println!("Manifest: {}", report.manifest_url);
    println!("Local CDN manifest: {}", report.cdn_manifest_path.display());

    Ok(())
}

fn publish<S: StorageClient>(
    storage: S,
    public_url: &str,
    config: &CdnConfig,
    processed_dir: &Path,
    builder: &ManifestBuilder,
) -> Result<UploadReport> {
    let mut uploader = CdnUploader::new(storage, public_url, config.cache.clone());
    let report = upload_processed(&mut uploader, processed_dir, builder).context("Upload failed")?;
    Ok(report)
}
