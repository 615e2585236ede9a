//! Mesh reference rewriting inside URDF documents
//!
//! Rewriting is plain substring substitution, not XML-aware. A mesh filename
//! that also occurs inside an unrelated token is replaced there too; URDF
//! exporters pick filenames that avoid this, and output must stay identical
//! to the literal-substitution behaviour.

use crate::types::AssetRecord;
use cadcdn_core::Result;
use std::fs;
use std::path::Path;

/// Rewrites mesh references in a URDF to their processed names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrdfRewriter {
    normalize: bool,
}

impl Default for UrdfRewriter {
    fn default() -> Self {
        Self { normalize: true }
    }
}

impl UrdfRewriter {
    /// `normalize` converts every backslash to a forward slash before substitution
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }

    /// Rewrite `document`, returning the new text.
    ///
    /// Records are applied in the order given. Running this again on its own
    /// output with the same records changes nothing.
    pub fn rewrite(&self, document: &str, records: &[AssetRecord]) -> String {
        if self.normalize {
            update_references(&normalize_separators(document), records)
        } else {
            update_references(document, records)
        }
    }

    /// Rewrite the document at `source` and write it to `dest`
    pub fn rewrite_file(&self, source: &Path, records: &[AssetRecord], dest: &Path) -> Result<()> {
        let content = fs::read_to_string(source)?;
        let rewritten = self.rewrite(&content, records);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, rewritten)?;
        Ok(())
    }
}

/// Replace backslashes with forward slashes
pub fn normalize_separators(content: &str) -> String {
    content.replace('\\', "/")
}

/// Substitute each mesh record's processed name for its original name.
///
/// For every mesh record, in order, the bare filename, `assets/<name>` and
/// `assets\<name>` are each replaced everywhere. Non-mesh records (the
/// document itself) are left alone.
pub fn update_references(content: &str, records: &[AssetRecord]) -> String {
    let mut updated = content.to_string();

    for record in records.iter().filter(|r| r.is_mesh()) {
        // An empty pattern would match between every character
        if record.original_name.is_empty() {
            continue;
        }

        let patterns = [
            record.original_name.clone(),
            format!("assets/{}", record.original_name),
            format!("assets\\{}", record.original_name),
        ];
        for pattern in &patterns {
            updated = updated.replace(pattern.as_str(), &record.processed_name);
        }
    }

    updated
}
