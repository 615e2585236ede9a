//! Post-conversion hook for the CAD-to-URDF converter
//!
//! The converter calls this after it has written the raw URDF and meshes.
//! Settings come from the converter's own JSON config; unrelated keys in
//! that file are ignored.

use crate::pipeline::{run_pipeline, PipelineInputs, PipelineOutput};
use cadcdn_core::{CdnError, ProcessingConfig, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// CDN settings read from the converter's `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookSettings {
    #[serde(default)]
    pub cdn_enabled: bool,
    #[serde(default = "default_output_dir")]
    pub cdn_output_dir: String,
    #[serde(default = "default_hash_length")]
    pub cdn_hash_length: usize,
    #[serde(default = "default_true")]
    pub cdn_generate_manifest: bool,
    #[serde(default = "default_assets_directory")]
    pub assets_directory: String,
    #[serde(default)]
    pub output_filename: Option<String>,
    #[serde(default)]
    pub robot_name: Option<String>,
}

fn default_output_dir() -> String {
    "processed".to_string()
}
fn default_hash_length() -> usize {
    12
}
fn default_true() -> bool {
    true
}
fn default_assets_directory() -> String {
    "assets".to_string()
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            cdn_enabled: false,
            cdn_output_dir: default_output_dir(),
            cdn_hash_length: default_hash_length(),
            cdn_generate_manifest: true,
            assets_directory: default_assets_directory(),
            output_filename: None,
            robot_name: None,
        }
    }
}

impl HookSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CdnError::ConfigParse(format!("Failed to parse host config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CdnError::NotFound(path.to_path_buf()));
        }
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Stem of the entry document: `output_filename`, else `robot_name`, else "robot"
    pub fn output_stem(&self) -> &str {
        self.output_filename
            .as_deref()
            .or(self.robot_name.as_deref())
            .unwrap_or("robot")
    }

    /// Filename of the URDF the converter wrote
    pub fn entry_document(&self) -> String {
        format!("{}.urdf", self.output_stem())
    }

    /// `base` with the hook's overrides applied
    pub fn processing_config(&self, base: &ProcessingConfig) -> ProcessingConfig {
        ProcessingConfig {
            output_dir: self.cdn_output_dir.clone(),
            hash_length: self.cdn_hash_length,
            generate_manifest: self.cdn_generate_manifest,
            assets_dir: self.assets_directory.clone(),
            ..base.clone()
        }
    }
}

/// Runs the pipeline on behalf of the converter
#[derive(Debug, Clone)]
pub struct PostConvertHook {
    settings: HookSettings,
    processing: ProcessingConfig,
}

impl PostConvertHook {
    pub fn new(settings: HookSettings, base: &ProcessingConfig) -> Self {
        let processing = settings.processing_config(base);
        Self {
            settings,
            processing,
        }
    }

    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.cdn_enabled
    }

    /// Process the converter's output under `root`. Returns `None` when disabled.
    pub fn run(&self, root: &Path) -> Result<Option<PipelineOutput>> {
        if !self.is_enabled() {
            debug!("CDN processing disabled in host config");
            return Ok(None);
        }

        info!(output = %root.join(&self.processing.output_dir).display(), "CDN processing enabled");
        let inputs = PipelineInputs::from_config(root, &self.processing)
            .with_document(self.settings.entry_document());
        run_pipeline(&self.processing, &inputs).map(Some)
    }
}
