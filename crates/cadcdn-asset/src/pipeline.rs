//! Three-stage pipeline: meshes, then the URDF, then the manifest
//!
//! The mesh stage tolerates per-file failures. The document stage is a join
//! point: it needs every mesh record, in order, before rewriting references.

use crate::manifest::{human_size, total_size, Manifest, ManifestBuilder, MANIFEST_FILE};
use crate::processor::AssetProcessor;
use crate::rewrite::UrdfRewriter;
use crate::types::AssetRecord;
use cadcdn_core::{Hasher, ProcessingConfig, Result};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extension of the URDF entry document
const DOCUMENT_EXTENSION: &str = "urdf";

/// Where the pipeline reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInputs {
    /// Project root; record paths are relative to it
    pub root: PathBuf,
    /// Directory holding the mesh files
    pub assets_dir: PathBuf,
    /// Entry document. When `None` the first `*.urdf` at the root is used.
    pub document: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl PipelineInputs {
    /// Standard layout under `root`: `<root>/<assets_dir>` in, `<root>/<output_dir>` out
    pub fn from_config(root: &Path, config: &ProcessingConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            assets_dir: root.join(&config.assets_dir),
            document: None,
            output_dir: root.join(&config.output_dir),
        }
    }

    pub fn with_document(mut self, document: impl Into<PathBuf>) -> Self {
        self.document = Some(document.into());
        self
    }
}

/// A mesh that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Records in processing order: meshes by filename, then the document
    pub records: Vec<AssetRecord>,
    pub manifest: Option<Manifest>,
    pub manifest_path: Option<PathBuf>,
    pub failures: Vec<AssetFailure>,
}

impl PipelineOutput {
    pub fn document(&self) -> Option<&AssetRecord> {
        self.records.iter().find(|r| r.is_document())
    }
}

/// The asset rewriting pipeline
pub struct Pipeline {
    hasher: Arc<dyn Hasher>,
    rewriter: UrdfRewriter,
    builder: ManifestBuilder,
    mesh_extension: String,
    generate_manifest: bool,
    parallel: bool,
    metadata: Option<Map<String, Value>>,
}

impl Pipeline {
    /// Set up a pipeline. An unknown hash algorithm fails here, before any file I/O.
    pub fn new(config: &ProcessingConfig) -> Result<Self> {
        let hasher: Arc<dyn Hasher> = Arc::from(config.hasher()?);
        Ok(Self {
            hasher,
            rewriter: UrdfRewriter::default(),
            builder: ManifestBuilder::from_config(config),
            mesh_extension: config.mesh_extension.clone(),
            generate_manifest: config.generate_manifest,
            parallel: config.parallel,
            metadata: None,
        })
    }

    /// Extra top-level fields for the manifest
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_rewriter(mut self, rewriter: UrdfRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Run all three stages.
    ///
    /// Mesh failures are logged and collected. A missing entry document skips
    /// the document stage only. IO errors in the document or manifest stage
    /// abort the run.
    pub fn run(&self, inputs: &PipelineInputs) -> Result<PipelineOutput> {
        fs::create_dir_all(&inputs.output_dir)?;
        let processor = AssetProcessor::new(self.hasher.clone(), &inputs.output_dir);

        // Stage 1: meshes
        let meshes = self.discover_meshes(&inputs.assets_dir)?;
        info!(count = meshes.len(), dir = %inputs.assets_dir.display(), "Processing mesh assets");
        let (mut records, failures) = self.process_meshes(&processor, &meshes, &inputs.root);

        // Stage 2: entry document
        match locate_document(&inputs.root, inputs.document.as_deref()) {
            Some(document) => {
                let record = self.process_document(&processor, &document, &records, &inputs.root)?;
                records.push(record);
            }
            None => {
                let expected = inputs
                    .document
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| format!("*.{}", DOCUMENT_EXTENSION));
                warn!(expected = %expected, root = %inputs.root.display(), "URDF file not found, skipping document stage");
            }
        }

        // Stage 3: manifest
        let (manifest, manifest_path) = if self.generate_manifest {
            let manifest = self.builder.build(&records, self.metadata.as_ref());
            let path = inputs.output_dir.join(MANIFEST_FILE);
            self.builder.write(&manifest, &path)?;
            info!(
                path = %path.display(),
                assets = records.len(),
                total_size = %human_size(total_size(&records)),
                "Manifest generated"
            );
            (Some(manifest), Some(path))
        } else {
            (None, None)
        };

        Ok(PipelineOutput {
            records,
            manifest,
            manifest_path,
            failures,
        })
    }

    /// Mesh files directly inside `assets_dir`, sorted by filename.
    ///
    /// Dotfiles are included and the extension match is case-sensitive. A
    /// missing directory yields no meshes.
    pub fn discover_meshes(&self, assets_dir: &Path) -> Result<Vec<PathBuf>> {
        if !assets_dir.is_dir() {
            warn!(dir = %assets_dir.display(), "Assets directory not found");
            return Ok(Vec::new());
        }

        let wanted = OsStr::new(&self.mesh_extension);
        let mut meshes = Vec::new();
        for entry in fs::read_dir(assets_dir)? {
            let path = entry?.path();
            if path.extension() == Some(wanted) {
                meshes.push(path);
            }
        }

        meshes.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(meshes)
    }

    /// Process each mesh, keeping input order. Failures are logged and skipped.
    pub fn process_meshes(
        &self,
        processor: &AssetProcessor,
        paths: &[PathBuf],
        root: &Path,
    ) -> (Vec<AssetRecord>, Vec<AssetFailure>) {
        let results: Vec<(&PathBuf, Result<AssetRecord>)> = if self.parallel {
            paths
                .par_iter()
                .map(|path| (path, processor.process_file(path, root)))
                .collect()
        } else {
            paths
                .iter()
                .map(|path| (path, processor.process_file(path, root)))
                .collect()
        };

        let mut records = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (path, result) in results {
            match result {
                Ok(record) => {
                    info!("{} -> {}", record.original_name, record.processed_name);
                    records.push(record);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to process mesh, skipping");
                    failures.push(AssetFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        (records, failures)
    }

    /// Rewrite the document's mesh references, then hash and write the result
    pub fn process_document(
        &self,
        processor: &AssetProcessor,
        document: &Path,
        mesh_records: &[AssetRecord],
        root: &Path,
    ) -> Result<AssetRecord> {
        debug!(document = %document.display(), "Updating URDF references");
        let content = fs::read_to_string(document)?;
        let content = if content.contains('\r') {
            normalize_line_endings(&content)
        } else {
            content
        };
        let rewritten = self.rewriter.rewrite(&content, mesh_records);
        let record = processor.process_content(document, &rewritten, root)?;
        info!("{} -> {}", record.original_name, record.processed_name);
        Ok(record)
    }
}

/// `\r\n` and lone `\r` become `\n`, so the hash does not depend on how the
/// URDF was authored.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Resolve the entry document: an explicit path (relative to `root` unless
/// absolute) if it exists, else the first `*.urdf` at the root by filename.
fn locate_document(root: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        return path.is_file().then_some(path);
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension() == Some(OsStr::new(DOCUMENT_EXTENSION)))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Host entry point: build a pipeline from `config` and run it over `inputs`.
pub fn run_pipeline(config: &ProcessingConfig, inputs: &PipelineInputs) -> Result<PipelineOutput> {
    Pipeline::new(config)?.run(inputs)
}
