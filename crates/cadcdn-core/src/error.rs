//! Error types for cadcdn

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cadcdn operations
#[derive(Debug, Error)]
pub enum CdnError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias for cadcdn operations
pub type Result<T> = std::result::Result<T, CdnError>;

impl CdnError {
    /// Whether this error is a missing-input error (source file or document absent)
    pub fn is_not_found(&self) -> bool {
        match self {
            CdnError::NotFound(_) => true,
            CdnError::IoError(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<toml::de::Error> for CdnError {
    fn from(err: toml::de::Error) -> Self {
        CdnError::ConfigParse(err.to_string())
    }
}
