//! Post-conversion hook command

use anyhow::{Context, Result};
use cadcdn_asset::{HookSettings, PostConvertHook};
use cadcdn_core::CdnConfig;
use std::path::Path;
use tracing::{debug, warn};

pub fn run(host_config: &str, root: Option<&str>) -> Result<()> {
    let host_config = Path::new(host_config);
    let settings = HookSettings::load(host_config)
        .with_context(|| format!("Failed to read host config {}", host_config.display()))?;

    let root = match root {
        Some(root) => Path::new(root).to_path_buf(),
        None => host_config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };

    debug!(root = %root.display(), config = %host_config.display(), "Running post-conversion hook");
    let config = CdnConfig::load(&root).context("Failed to load configuration")?;
    let hook = PostConvertHook::new(settings, &config.processing);

    match hook.run(&root)? {
        None => println!("CDN processing disabled (set cdn_enabled in {})", host_config.display()),
        Some(output) => {
            println!(
                "CDN processing complete: {} asset(s) in {}",
                output.records.len(),
                root.join(&hook.settings().cdn_output_dir).display()
            );
            if let Some(document) = output.document() {
                println!("  URDF: {}", document.processed_name);
            }
            for failure in &output.failures {
                warn!(file = %failure.path.display(), reason = %failure.reason, "Mesh not published");
                println!("  failed: {}: {}", failure.path.display(), failure.reason);
            }
        }
    }

    Ok(())
}
