//! JSON manifest describing a processed asset set
//!
//! The manifest lists every asset in processing order (meshes sorted by
//! filename, the URDF last) and can be re-parsed into the same records.

use crate::types::AssetRecord;
use cadcdn_core::{CdnError, ProcessingConfig, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::warn;

/// Identifies this tool in the `processor` field
pub const PRODUCER: &str = "onshape-to-robot-cdn";

/// Filename of the base manifest in the output directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Filename of the manifest variant carrying public URLs
pub const CDN_MANIFEST_FILE: &str = "manifest.cdn.json";

/// Top-level keys owned by the manifest itself
const RESERVED_KEYS: &[&str] = &["version", "generated", "processor", "assets"];

/// One asset entry: the record plus an optional public URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestAsset {
    #[serde(flatten)]
    pub record: AssetRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A versioned, serializable description of the processed assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "version")]
    pub format_version: String,
    /// ISO-8601 UTC build time
    #[serde(rename = "generated")]
    pub generated_at: String,
    #[serde(rename = "processor")]
    pub producer: String,
    pub assets: Vec<ManifestAsset>,
    /// Extra metadata merged in at build time
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Parse manifest JSON
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| CdnError::Manifest(format!("Failed to parse manifest: {}", e)))
    }

    /// Load a manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CdnError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// The asset records, without URLs
    pub fn records(&self) -> Vec<AssetRecord> {
        self.assets.iter().map(|a| a.record.clone()).collect()
    }

    /// The URDF entry document, if present
    pub fn document(&self) -> Option<&ManifestAsset> {
        self.assets.iter().find(|a| a.record.is_document())
    }

    /// Every asset except the entry document
    pub fn non_documents(&self) -> impl Iterator<Item = &ManifestAsset> {
        self.assets.iter().filter(|a| !a.record.is_document())
    }
}

/// Builds, serializes and annotates manifests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestBuilder {
    version: String,
    pretty: bool,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new("1.0.0", true)
    }
}

impl ManifestBuilder {
    pub fn new(version: impl Into<String>, pretty: bool) -> Self {
        Self {
            version: version.into(),
            pretty,
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.manifest_version.clone(), config.pretty_manifest)
    }

    /// Assemble a manifest from records, stamped with the current UTC time.
    ///
    /// Extra metadata keys colliding with the manifest's own keys are dropped.
    pub fn build(&self, records: &[AssetRecord], extra: Option<&Map<String, Value>>) -> Manifest {
        let mut merged = Map::new();
        for (key, value) in extra.into_iter().flatten() {
            if RESERVED_KEYS.contains(&key.as_str()) {
                warn!(key = %key, "Ignoring extra manifest metadata that shadows a manifest field");
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }

        Manifest {
            format_version: self.version.clone(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            producer: PRODUCER.to_string(),
            assets: records
                .iter()
                .map(|record| ManifestAsset {
                    record: record.clone(),
                    url: None,
                })
                .collect(),
            extra: merged,
        }
    }

    /// Render manifest JSON, indented when the builder is pretty
    pub fn serialize(&self, manifest: &Manifest) -> Result<Vec<u8>> {
        let rendered = if self.pretty {
            serde_json::to_vec_pretty(manifest)
        } else {
            serde_json::to_vec(manifest)
        };
        rendered.map_err(|e| CdnError::Manifest(format!("Failed to serialize manifest: {}", e)))
    }

    /// Write a manifest to `path`, creating parent directories
    pub fn write(&self, manifest: &Manifest, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.serialize(manifest)?)?;
        Ok(())
    }

    /// Return a copy of `manifest` with a public `url` on every asset.
    ///
    /// The URDF entry point sits at the root of `base_url`; everything else
    /// lives under `base_url/assets/`.
    pub fn overlay_urls(manifest: &Manifest, base_url: &str) -> Manifest {
        let mut updated = manifest.clone();
        for asset in &mut updated.assets {
            let url = if asset.record.is_document() {
                format!("{}/{}", base_url, asset.record.processed_name)
            } else {
                format!("{}/assets/{}", base_url, asset.record.processed_name)
            };
            asset.url = Some(url);
        }
        updated
    }
}

/// Sum of `size_bytes` over all records
pub fn total_size(records: &[AssetRecord]) -> u64 {
    records.iter().map(|r| r.size_bytes).sum()
}

/// Format a byte count with 1024-based units and two decimals (e.g. "2.00 KB")
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(original: &str, processed: &str, size: u64, media_type: &str) -> AssetRecord {
        AssetRecord {
            original_name: original.to_string(),
            processed_name: processed.to_string(),
            content_hash: "abc123def456".to_string(),
            size_bytes: size,
            media_type: media_type.to_string(),
            relative_path: format!("assets/{}", original),
        }
    }

    fn sample_records() -> Vec<AssetRecord> {
        vec![
            record("arm.stl", "arm.abc123def456.stl", 500, "model/stl"),
            record("base.stl", "base.abc123def456.stl", 1500, "model/stl"),
            record("robot.urdf", "robot.abc123def456.urdf", 800, "application/xml"),
        ]
    }

    #[test]
    fn test_build() {
        let manifest = ManifestBuilder::default().build(&sample_records(), None);
        assert_eq!(manifest.format_version, "1.0.0");
        assert_eq!(manifest.producer, PRODUCER);
        assert_eq!(manifest.assets.len(), 3);
        assert!(manifest.assets.iter().all(|a| a.url.is_none()));
        assert!(manifest.generated_at.contains('T'));
        assert!(manifest.generated_at.ends_with("+00:00"));
        assert!(chrono::DateTime::parse_from_rfc3339(&manifest.generated_at).is_ok());
    }

    #[test]
    fn test_json_keys() {
        let builder = ManifestBuilder::default();
        let manifest = builder.build(&sample_records()[..1], None);
        let value: Value = serde_json::from_slice(&builder.serialize(&manifest).unwrap()).unwrap();

        let top: Vec<&str> = {
            let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
            keys.sort();
            keys
        };
        assert_eq!(top, vec!["assets", "generated", "processor", "version"]);
        assert_eq!(
            value["assets"][0],
            serde_json::json!({
                "original": "arm.stl",
                "processed": "arm.abc123def456.stl",
                "hash": "abc123def456",
                "size": 500,
                "type": "model/stl",
                "path": "assets/arm.stl",
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let builder = ManifestBuilder::default();
        let records = sample_records();
        let manifest = builder.build(&records, None);

        let parsed = Manifest::from_slice(&builder.serialize(&manifest).unwrap()).unwrap();
        assert_eq!(parsed.records(), records);
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_round_trip_ignores_urls() {
        let builder = ManifestBuilder::new("1.0.0", false);
        let records = sample_records();
        let with_urls = ManifestBuilder::overlay_urls(&builder.build(&records, None), "https://cdn");

        let parsed = Manifest::from_slice(&builder.serialize(&with_urls).unwrap()).unwrap();
        assert_eq!(parsed.records(), records);
        assert!(parsed.assets.iter().all(|a| a.url.is_some()));
    }

    #[test]
    fn test_compact_vs_pretty() {
        let manifest = ManifestBuilder::default().build(&sample_records(), None);
        let pretty = ManifestBuilder::new("1.0.0", true).serialize(&manifest).unwrap();
        let compact = ManifestBuilder::new("1.0.0", false).serialize(&manifest).unwrap();
        assert!(pretty.contains(&b'\n'));
        assert!(!compact.contains(&b'\n'));
        assert!(pretty.windows(3).any(|w| w == b"\n  "));
    }

    #[test]
    fn test_extra_metadata() {
        let mut extra = Map::new();
        extra.insert("robot".to_string(), Value::String("openarm".to_string()));
        extra.insert("version".to_string(), Value::String("9.9.9".to_string()));

        let builder = ManifestBuilder::default();
        let manifest = builder.build(&sample_records(), Some(&extra));
        assert_eq!(manifest.extra.get("robot"), Some(&Value::String("openarm".to_string())));
        assert!(!manifest.extra.contains_key("version"));

        let value: Value = serde_json::from_slice(&builder.serialize(&manifest).unwrap()).unwrap();
        assert_eq!(value["robot"], "openarm");
        assert_eq!(value["version"], "1.0.0");

        let parsed = Manifest::from_slice(&builder.serialize(&manifest).unwrap()).unwrap();
        assert_eq!(parsed.extra.get("robot"), Some(&Value::String("openarm".to_string())));
    }

    #[test]
    fn test_overlay_urls() {
        let manifest = ManifestBuilder::default().build(&sample_records(), None);
        let before = manifest.clone();

        let with_urls = ManifestBuilder::overlay_urls(&manifest, "https://assets.openarm.dev");
        assert_eq!(manifest, before);

        assert_eq!(
            with_urls.assets[0].url.as_deref(),
            Some("https://assets.openarm.dev/assets/arm.abc123def456.stl")
        );
        assert_eq!(
            with_urls.assets[1].url.as_deref(),
            Some("https://assets.openarm.dev/assets/base.abc123def456.stl")
        );
        assert_eq!(
            with_urls.document().and_then(|a| a.url.as_deref()),
            Some("https://assets.openarm.dev/robot.abc123def456.urdf")
        );
        assert_eq!(with_urls.generated_at, manifest.generated_at);
    }

    #[test]
    fn test_document_and_non_documents() {
        let manifest = ManifestBuilder::default().build(&sample_records(), None);
        assert_eq!(manifest.document().unwrap().record.original_name, "robot.urdf");
        assert_eq!(manifest.non_documents().count(), 2);
    }

    #[test]
    fn test_write_and_load() {
        let dir = std::env::temp_dir().join(format!("cadcdn_manifest_test_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join(MANIFEST_FILE);

        let builder = ManifestBuilder::default();
        let manifest = builder.build(&sample_records(), None);
        builder.write(&manifest, &path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_and_invalid() {
        assert!(matches!(
            Manifest::load(Path::new("/no/such/manifest.json")),
            Err(CdnError::NotFound(_))
        ));
        assert!(matches!(
            Manifest::from_slice(b"{\"version\": 1}"),
            Err(CdnError::Manifest(_))
        ));
    }

    #[test]
    fn test_total_size() {
        let records = vec![
            record("a.stl", "a.x.stl", 500, "model/stl"),
            record("b.stl", "b.x.stl", 1500, "model/stl"),
        ];
        assert_eq!(total_size(&records), 2000);
        assert_eq!(total_size(&[]), 0);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0.00 B");
        assert_eq!(human_size(1023), "1023.00 B");
        assert_eq!(human_size(2048), "2.00 KB");
        assert_eq!(human_size(1536 * 1024), "1.50 MB");
        assert_eq!(human_size(5 * 1024 * 1024 * 1024), "5.00 GB");
        assert_eq!(human_size(3 * 1024u64.pow(4)), "3.00 TB");
    }
}
