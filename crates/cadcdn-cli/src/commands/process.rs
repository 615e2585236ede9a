//! Process command

use anyhow::{Context, Result};
use cadcdn_asset::{human_size, total_size, Pipeline, PipelineInputs};
use cadcdn_core::CdnConfig;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

pub struct ProcessArgs {
    pub root: String,
    pub document: Option<String>,
    pub output_dir: Option<String>,
    pub parallel: bool,
    pub metadata: Vec<(String, String)>,
}

pub fn run(args: ProcessArgs) -> Result<()> {
    let root = Path::new(&args.root);
    let mut config = CdnConfig::load(root).context("Failed to load configuration")?;

    if let Some(output_dir) = args.output_dir {
        config.processing.output_dir = output_dir;
    }
    if args.parallel {
        config.processing.parallel = true;
    }

    let mut pipeline = Pipeline::new(&config.processing)?;
    if !args.metadata.is_empty() {
        let metadata: Map<String, Value> = args
            .metadata
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        pipeline = pipeline.with_metadata(metadata);
    }

    let mut inputs = PipelineInputs::from_config(root, &config.processing);
    if let Some(document) = args.document {
        inputs = inputs.with_document(document);
    }

    debug!(
        root = %root.display(),
        algorithm = %config.processing.hash_algorithm,
        hash_length = config.processing.hash_length,
        parallel = config.processing.parallel,
        "Resolved processing config"
    );
    let output = pipeline.run(&inputs).context("Processing failed")?;

    println!("Processed {} asset(s) into {}", output.records.len(), inputs.output_dir.display());
    for record in &output.records {
        println!(
            "  {} -> {} ({})",
            record.original_name,
            record.processed_name,
            human_size(record.size_bytes)
        );
    }
    println!("Total: {}", human_size(total_size(&output.records)));

    if output.document().is_none() {
        println!("Warning: no URDF was processed");
    }
    if let Some(path) = &output.manifest_path {
        println!("Manifest: {}", path.display());
    }

    if !output.failures.is_empty() {
        warn!(
            failed = output.failures.len(),
            "Some meshes were left out of the manifest and their URDF references were not rewritten"
        );
        println!("\n{} file(s) failed:", output.failures.len());
        for failure in &output.failures {
            println!("  {}: {}", failure.path.display(), failure.reason);
        }
    }

    Ok(())
}
