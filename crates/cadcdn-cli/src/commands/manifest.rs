//! Manifest inspection command

use anyhow::{Context, Result};
use cadcdn_asset::{human_size, total_size, Manifest};
use std::path::Path;

pub fn run(path: &str) -> Result<()> {
    let manifest = Manifest::load(Path::new(path))
        .with_context(|| format!("Failed to load manifest {}", path))?;

    println!(
        "Manifest v{} ({}), generated {}",
        manifest.format_version, manifest.producer, manifest.generated_at
    );
    for (key, value) in &manifest.extra {
        println!("  {}: {}", key, value);
    }

    println!("\n{} asset(s):", manifest.assets.len());
    for asset in &manifest.assets {
        let record = &asset.record;
        println!(
            "  {:<30} {:<36} {:>10}  {}",
            record.original_name,
            record.processed_name,
            human_size(record.size_bytes),
            record.media_type
        );
        if let Some(url) = &asset.url {
            println!("    {}", url);
        }
    }

    println!("\nTotal: {}", human_size(total_size(&manifest.records())));
    Ok(())
}
