//! Asset record and media type definitions

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Media type for extensions missing from the table
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Media type of the URDF entry document
pub const DOCUMENT_MEDIA_TYPE: &str = "application/xml";

/// Extension (lowercase, no dot) to media type
const MEDIA_TYPES: &[(&str, &str)] = &[
    ("stl", "model/stl"),
    ("dae", "model/vnd.collada+xml"),
    ("obj", "model/obj"),
    ("urdf", DOCUMENT_MEDIA_TYPE),
    ("xml", DOCUMENT_MEDIA_TYPE),
];

/// Classify a file by its extension, case-insensitively
pub fn media_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT_MEDIA_TYPE;
    };
    let ext = ext.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, media_type)| *media_type)
        .unwrap_or(DEFAULT_MEDIA_TYPE)
}

/// Cache-busting filename: `{stem}.{hash}{extension}`.
///
/// `extension` carries its leading dot, or is empty for extensionless files.
pub fn processed_name(stem: &str, hash: &str, extension: &str) -> String {
    format!("{}.{}{}", stem, hash, extension)
}

/// Split a path's filename into stem and dotted extension
pub(crate) fn stem_and_extension(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, extension)
}

/// Description of one processed asset.
///
/// Serialized with the manifest's short key names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Source filename, without directory
    #[serde(rename = "original")]
    pub original_name: String,
    #[serde(rename = "processed")]
    pub processed_name: String,
    #[serde(rename = "hash")]
    pub content_hash: String,
    /// Byte length of the source at processing time
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "type")]
    pub media_type: String,
    /// Source path relative to the project root, or absolute if outside it
    #[serde(rename = "path")]
    pub relative_path: String,
}

impl AssetRecord {
    /// Mesh assets are the only ones whose references get rewritten
    pub fn is_mesh(&self) -> bool {
        self.media_type.starts_with("model/")
    }

    /// Whether this is the URDF entry document
    pub fn is_document(&self) -> bool {
        self.media_type == DOCUMENT_MEDIA_TYPE
    }
}
