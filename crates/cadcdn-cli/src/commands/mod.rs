//! CLI command implementations

pub mod hook;
pub mod manifest;
pub mod process;
pub mod upload;
