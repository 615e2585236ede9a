//! Per-file hashing, renaming and copying

use crate::types::{media_type_for, processed_name, stem_and_extension, AssetRecord};
use cadcdn_core::{CdnError, Hasher, Result};
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Copies source files into an output directory under content-hashed names.
///
/// Every call copies again, even when an identical file is already in place.
pub struct AssetProcessor {
    hasher: Arc<dyn Hasher>,
    output_dir: PathBuf,
}

impl AssetProcessor {
    /// Create a processor writing into `output_dir`
    pub fn new<P: AsRef<Path>>(hasher: Arc<dyn Hasher>, output_dir: P) -> Self {
        Self {
            hasher,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn hasher(&self) -> &dyn Hasher {
        self.hasher.as_ref()
    }

    /// Hash `source_path`, copy it to `output_dir/{stem}.{hash}{ext}` and describe it.
    ///
    /// `relative_path` in the record is computed against `relative_root`; a
    /// source outside that root keeps its absolute path.
    pub fn process_file(&self, source_path: &Path, relative_root: &Path) -> Result<AssetRecord> {
        if !source_path.exists() {
            return Err(CdnError::NotFound(source_path.to_path_buf()));
        }

        let source = resolve(source_path);
        let root = resolve(relative_root);

        let hash = self.hasher.hash_file(&source)?;
        let (stem, extension) = stem_and_extension(&source);
        let output_name = processed_name(&stem, &hash, &extension);

        fs::create_dir_all(&self.output_dir)?;
        copy_preserving_metadata(&source, &self.output_dir.join(&output_name))?;

        let size_bytes = fs::metadata(&source)?.len();

        Ok(AssetRecord {
            original_name: file_name(&source),
            processed_name: output_name,
            content_hash: hash,
            size_bytes,
            media_type: media_type_for(&source).to_string(),
            relative_path: relative_path(&source, &root),
        })
    }

    /// Write already-transformed text for `source_path` under its hashed name.
    ///
    /// Used for the rewritten URDF: the digest covers `content`, not the file
    /// on disk, and the recorded size is the written byte length.
    pub fn process_content(
        &self,
        source_path: &Path,
        content: &str,
        relative_root: &Path,
    ) -> Result<AssetRecord> {
        let source = resolve(source_path);
        let root = resolve(relative_root);

        let hash = self.hasher.hash_string(content);
        let (stem, extension) = stem_and_extension(&source);
        let output_name = processed_name(&stem, &hash, &extension);

        fs::create_dir_all(&self.output_dir)?;
        fs::write(self.output_dir.join(&output_name), content)?;

        Ok(AssetRecord {
            original_name: file_name(&source),
            processed_name: output_name,
            content_hash: hash,
            size_bytes: content.len() as u64,
            media_type: media_type_for(&source).to_string(),
            relative_path: relative_path(&source, &root),
        })
    }

    /// Copy `source` into `dest_dir` under its hashed name and return the new path
    pub fn copy_with_hash(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let hash = self.hasher.hash_file(source)?;
        let (stem, extension) = stem_and_extension(source);
        let dest = dest_dir.join(processed_name(&stem, &hash, &extension));

        fs::create_dir_all(dest_dir)?;
        copy_preserving_metadata(source, &dest)?;
        Ok(dest)
    }
}

/// Absolute, symlink-resolved form of `path`; falls back to a lexical
/// absolute path when the target does not exist.
fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn relative_path(file: &Path, root: &Path) -> String {
    match file.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => file.to_string_lossy().into_owned(),
    }
}

/// `fs::copy` carries permissions; timestamps are applied afterwards.
///
/// The copy may be read-only, so an earlier copy is removed first and the
/// times are set through a read-only handle.
fn copy_preserving_metadata(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::remove_file(dest) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    fs::copy(source, dest)?;

    let meta = fs::metadata(source)?;
    let mut times = FileTimes::new();
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    File::open(dest)?.set_times(times)
}
