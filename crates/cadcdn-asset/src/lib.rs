//! cadcdn Asset - Content-addressed asset rewriting pipeline
//!
//! Hashes mesh files and the URDF entry document, copies them under
//! cache-busting names, rewrites the document's mesh references, and
//! describes the result in a JSON manifest.

mod hook;
mod manifest;
mod pipeline;
mod processor;
mod rewrite;
mod types;

pub use hook::{HookSettings, PostConvertHook};
pub use manifest::{
    human_size, total_size, Manifest, ManifestAsset, ManifestBuilder, CDN_MANIFEST_FILE,
    MANIFEST_FILE, PRODUCER,
};
pub use pipeline::{run_pipeline, AssetFailure, Pipeline, PipelineInputs, PipelineOutput};
pub use processor::AssetProcessor;
pub use rewrite::{normalize_separators, update_references, UrdfRewriter};
pub use types::{
    media_type_for, processed_name, AssetRecord, DEFAULT_MEDIA_TYPE, DOCUMENT_MEDIA_TYPE,
};
