//! cadcdn Core - Foundational types for the CDN asset pipeline
//!
//! This crate provides the pieces every other cadcdn crate depends on:
//! - `Hasher` - Truncated content digests behind a swappable capability
//! - `CdnConfig` - Layered configuration resolved once at startup
//! - Error types and Result alias

pub mod config;
mod error;
mod hash;

pub use config::{CacheConfig, CdnConfig, ProcessingConfig, R2Config};
pub use error::{CdnError, Result};
pub use hash::{create_hasher, DigestHasher, Hasher, Sha256Hasher, Sha512Hasher, SUPPORTED_ALGORITHMS};
