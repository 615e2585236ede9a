//! Truncated content digests for cache-busting filenames

use crate::error::{CdnError, Result};
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::marker::PhantomData;
use std::path::Path;

/// Bytes read per iteration when hashing a file. Meshes can be large, so
/// files are never read whole into memory.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Algorithm names accepted by [`create_hasher`]
pub const SUPPORTED_ALGORITHMS: &[&str] = &["sha256", "sha512"];

/// Capability for computing a truncated, lowercase hex content digest.
///
/// The truncation is a filename-length trade-off, not a security boundary.
pub trait Hasher: Send + Sync {
    /// Algorithm name (e.g. "sha256")
    fn algorithm(&self) -> &str;

    /// Number of hex characters in every digest this hasher returns
    fn length(&self) -> usize;

    /// Hash a file's contents, streaming it in bounded chunks
    fn hash_file(&self, path: &Path) -> Result<String>;

    /// Hash UTF-8 text
    fn hash_string(&self, content: &str) -> String;
}

/// A [`Hasher`] backed by any `sha2`-style [`Digest`].
pub struct DigestHasher<D> {
    name: &'static str,
    length: usize,
    _digest: PhantomData<fn() -> D>,
}

/// SHA-256 hasher (the default)
pub type Sha256Hasher = DigestHasher<Sha256>;

/// SHA-512 hasher
pub type Sha512Hasher = DigestHasher<Sha512>;

impl<D: Digest> DigestHasher<D> {
    fn with_name(name: &'static str, length: usize) -> Result<Self> {
        let max = <D as Digest>::output_size() * 2;
        if length == 0 || length > max {
            return Err(CdnError::InvalidConfig(format!(
                "hash length for {} must be between 1 and {}, got {}",
                name, max, length
            )));
        }
        Ok(Self {
            name,
            length,
            _digest: PhantomData,
        })
    }

    fn finish(&self, digest: D) -> String {
        let hex: String = digest
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        hex[..self.length].to_string()
    }
}

impl DigestHasher<Sha256> {
    /// Create a SHA-256 hasher returning `length` hex characters
    pub fn new(length: usize) -> Result<Self> {
        Self::with_name("sha256", length)
    }
}

impl DigestHasher<Sha512> {
    /// Create a SHA-512 hasher returning `length` hex characters
    pub fn new(length: usize) -> Result<Self> {
        Self::with_name("sha512", length)
    }
}

impl<D: Digest> Hasher for DigestHasher<D> {
    fn algorithm(&self) -> &str {
        self.name
    }

    fn length(&self) -> usize {
        self.length
    }

    fn hash_file(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CdnError::NotFound(path.to_path_buf()),
            _ => CdnError::IoError(e),
        })?;

        let mut digest = D::new();
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            digest.update(&buf[..n]);
        }

        Ok(self.finish(digest))
    }

    fn hash_string(&self, content: &str) -> String {
        let mut digest = D::new();
        digest.update(content.as_bytes());
        self.finish(digest)
    }
}

/// Create a hasher by algorithm name.
///
/// Unknown names fail immediately with [`CdnError::UnsupportedAlgorithm`],
/// before any file is touched.
pub fn create_hasher(algorithm: &str, length: usize) -> Result<Box<dyn Hasher>> {
    match algorithm {
        "sha256" => Ok(Box::new(Sha256Hasher::new(length)?)),
        "sha512" => Ok(Box::new(Sha512Hasher::new(length)?)),
        _ => Err(CdnError::UnsupportedAlgorithm(format!(
            "'{}'. Available: {}",
            algorithm,
            SUPPORTED_ALGORITHMS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cadcdn_hash_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_known_sha256_prefix() {
        let hasher = Sha256Hasher::new(12).unwrap();
        assert_eq!(hasher.hash_string("hello"), "2cf24dba5fb0");
    }

    #[test]
    fn test_known_sha512_prefix() {
        let hasher = Sha512Hasher::new(12).unwrap();
        assert_eq!(hasher.hash_string("hello"), "9b71d224bd62");
    }

    #[test]
    fn test_consistent_hashing() {
        let hasher = Sha256Hasher::new(12).unwrap();
        assert_eq!(hasher.hash_string("hello"), hasher.hash_string("hello"));
        assert_ne!(hasher.hash_string("hello"), hasher.hash_string("world"));
    }

    #[test]
    fn test_length_is_respected() {
        let hasher = Sha256Hasher::new(64).unwrap();
        let full = hasher.hash_string("robot");
        assert_eq!(full.len(), 64);

        let short = Sha256Hasher::new(8).unwrap().hash_string("robot");
        assert_eq!(short, &full[..8]);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_identical_content_same_hash_regardless_of_name() {
        let dir = temp_dir();
        let a = dir.join("arm.stl");
        let b = dir.join("nested").join("gripper.stl");
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&a, b"solid arm\nendsolid arm\n").unwrap();
        fs::write(&b, b"solid arm\nendsolid arm\n").unwrap();

        let hasher = Sha256Hasher::new(12).unwrap();
        assert_eq!(hasher.hash_file(&a).unwrap(), hasher.hash_file(&b).unwrap());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_streamed_file_matches_string_hash() {
        let dir = temp_dir();
        let path = dir.join("big.stl");
        // Larger than several read chunks
        let content = "facet normal 0 0 1\n".repeat(20_000);
        fs::write(&path, &content).unwrap();

        let hasher = Sha256Hasher::new(12).unwrap();
        assert_eq!(hasher.hash_file(&path).unwrap(), hasher.hash_string(&content));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let hasher = Sha256Hasher::new(12).unwrap();
        let err = hasher
            .hash_file(Path::new("/definitely/not/here.stl"))
            .unwrap_err();
        assert!(matches!(err, CdnError::NotFound(_)));
    }

    #[test]
    fn test_create_hasher_known() {
        let hasher = create_hasher("sha256", 12).unwrap();
        assert_eq!(hasher.algorithm(), "sha256");
        assert_eq!(hasher.length(), 12);

        let hasher = create_hasher("sha512", 20).unwrap();
        assert_eq!(hasher.algorithm(), "sha512");
        assert_eq!(hasher.hash_string("x").len(), 20);
    }

    #[test]
    fn test_create_hasher_unknown_fails_fast() {
        let err = create_hasher("md17", 12).err().unwrap();
        assert!(matches!(err, CdnError::UnsupportedAlgorithm(ref s) if s.contains("md17")));
    }

    #[test]
    fn test_invalid_length() {
        assert!(matches!(
            Sha256Hasher::new(0),
            Err(CdnError::InvalidConfig(_))
        ));
        assert!(matches!(
            Sha256Hasher::new(65),
            Err(CdnError::InvalidConfig(_))
        ));
        assert!(Sha512Hasher::new(128).is_ok());
    }
}
