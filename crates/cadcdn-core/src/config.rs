//! Layered configuration system
//!
//! Config is resolved once at startup with four layers of precedence (highest wins):
//! 1. Environment variables: `R2_*` and `CADCDN_*`
//! 2. Project-local: `<root>/cadcdn.toml`
//! 3. Global: `~/.cadcdn/config.toml`
//! 4. Built-in defaults
//!
//! The resolved [`CdnConfig`] is immutable and passed into constructors
//! explicitly. Nothing below the CLI reads the environment.

use crate::error::{CdnError, Result};
use crate::hash::{create_hasher, Hasher};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the project-local config file
pub const PROJECT_CONFIG_FILE: &str = "cadcdn.toml";

/// Asset processing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub hash_algorithm: String,
    pub hash_length: usize,
    /// Output directory, relative to the project root
    pub output_dir: String,
    pub generate_manifest: bool,
    pub manifest_version: String,
    pub pretty_manifest: bool,
    /// Mesh directory, relative to the project root
    pub assets_dir: String,
    /// Mesh file extension to pick up, without the dot
    pub mesh_extension: String,
    /// Process meshes on a thread pool
    pub parallel: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: "sha256".to_string(),
            hash_length: 12,
            output_dir: "processed".to_string(),
            generate_manifest: true,
            manifest_version: "1.0.0".to_string(),
            pretty_manifest: true,
            assets_dir: "assets".to_string(),
            mesh_extension: "stl".to_string(),
            parallel: false,
        }
    }
}

impl ProcessingConfig {
    /// Build the configured hasher, failing fast on an unknown algorithm
    pub fn hasher(&self) -> Result<Box<dyn Hasher>> {
        create_hasher(&self.hash_algorithm, self.hash_length)
    }
}

/// Cloudflare R2 (S3-compatible) storage settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Public base URL, without trailing slash
    pub public_url: String,
    pub region: String,
}

impl Default for R2Config {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket_name: "openarm-cad-assets".to_string(),
            public_url: "https://assets.openarm.dev".to_string(),
            region: "auto".to_string(),
        }
    }
}

impl fmt::Debug for R2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2Config")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("public_url", &self.public_url)
            .field("region", &self.region)
            .finish()
    }
}

impl R2Config {
    /// Names of required settings that are empty
    pub fn validate(&self) -> Vec<String> {
        [
            ("R2_ACCOUNT_ID", &self.account_id),
            ("R2_ACCESS_KEY_ID", &self.access_key_id),
            ("R2_SECRET_ACCESS_KEY", &self.secret_access_key),
            ("R2_BUCKET_NAME", &self.bucket_name),
            ("R2_PUBLIC_URL", &self.public_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// S3 API endpoint for the account
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }

    /// Public CDN URL for an object key
    pub fn cdn_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

/// CDN caching settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds
    pub asset_max_age: u64,
    pub asset_immutable: bool,
    /// Seconds
    pub manifest_max_age: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            asset_max_age: 31_536_000,
            asset_immutable: true,
            manifest_max_age: 300,
        }
    }
}

impl CacheConfig {
    /// Cache-Control header for content-hashed assets
    pub fn asset_cache_control(&self) -> String {
        let immutable = if self.asset_immutable { ", immutable" } else { "" };
        format!("public, max-age={}{}", self.asset_max_age, immutable)
    }

    /// Cache-Control header for the manifest
    pub fn manifest_cache_control(&self) -> String {
        format!("public, max-age={}", self.manifest_max_age)
    }
}

/// Partial processing settings as written in a config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingFile {
    pub hash_algorithm: Option<String>,
    pub hash_length: Option<usize>,
    pub output_dir: Option<String>,
    pub generate_manifest: Option<bool>,
    pub manifest_version: Option<String>,
    pub pretty_manifest: Option<bool>,
    pub assets_dir: Option<String>,
    pub mesh_extension: Option<String>,
    pub parallel: Option<bool>,
}

/// Partial R2 settings as written in a config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct R2File {
    pub account_id: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: Option<String>,
    pub public_url: Option<String>,
    pub region: Option<String>,
}

/// Partial cache settings as written in a config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheFile {
    pub asset_max_age: Option<u64>,
    pub asset_immutable: Option<bool>,
    pub manifest_max_age: Option<u64>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CdnConfigFile {
    #[serde(default)]
    pub processing: ProcessingFile,
    #[serde(default)]
    pub r2: R2File,
    #[serde(default)]
    pub cache: CacheFile,
}

/// Resolved configuration with every layer applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnConfig {
    pub processing: ProcessingConfig,
    pub r2: R2Config,
    pub cache: CacheConfig,
}

impl CdnConfig {
    /// Load config with layered precedence: defaults < global < project < env vars
    pub fn load(root: &Path) -> Result<Self> {
        let mut files = Vec::new();
        if let Some(global_path) = Self::global_config_path() {
            files.push(global_path);
        }
        files.push(root.join(PROJECT_CONFIG_FILE));

        Self::resolve(&files, |key| std::env::var(key).ok())
    }

    /// Load config from a specific file path only, still honouring env vars
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CdnError::NotFound(path.to_path_buf()));
        }
        Self::resolve(&[path.to_path_buf()], |key| std::env::var(key).ok())
    }

    /// Apply each existing file in order, then the environment lookup.
    pub fn resolve<F>(files: &[PathBuf], env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CdnConfig::default();
        for path in files {
            if path.exists() {
                let file = Self::load_file(path)?;
                config.merge(file);
            }
        }
        config.apply_env(env)?;
        config.r2.public_url = config.r2.public_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// R2 settings, failing if any required value is missing
    pub fn require_r2(&self) -> Result<&R2Config> {
        let missing = self.r2.validate();
        if missing.is_empty() {
            Ok(&self.r2)
        } else {
            Err(CdnError::MissingConfig(missing))
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".cadcdn").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<CdnConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            CdnError::ConfigParse(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    fn merge(&mut self, overlay: CdnConfigFile) {
        let p = &mut self.processing;
        let o = overlay.processing;
        set(&mut p.hash_algorithm, o.hash_algorithm);
        set(&mut p.hash_length, o.hash_length);
        set(&mut p.output_dir, o.output_dir);
        set(&mut p.generate_manifest, o.generate_manifest);
        set(&mut p.manifest_version, o.manifest_version);
        set(&mut p.pretty_manifest, o.pretty_manifest);
        set(&mut p.assets_dir, o.assets_dir);
        set(&mut p.mesh_extension, o.mesh_extension);
        set(&mut p.parallel, o.parallel);

        let r = &mut self.r2;
        let o = overlay.r2;
        set(&mut r.account_id, o.account_id);
        set(&mut r.access_key_id, o.access_key_id);
        set(&mut r.secret_access_key, o.secret_access_key);
        set(&mut r.bucket_name, o.bucket_name);
        set(&mut r.public_url, o.public_url);
        set(&mut r.region, o.region);

        let c = &mut self.cache;
        let o = overlay.cache;
        set(&mut c.asset_max_age, o.asset_max_age);
        set(&mut c.asset_immutable, o.asset_immutable);
        set(&mut c.manifest_max_age, o.manifest_max_age);
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let r = &mut self.r2;
        set(&mut r.account_id, env("R2_ACCOUNT_ID"));
        set(&mut r.access_key_id, env("R2_ACCESS_KEY_ID"));
        set(&mut r.secret_access_key, env("R2_SECRET_ACCESS_KEY"));
        set(&mut r.bucket_name, env("R2_BUCKET_NAME"));
        set(&mut r.public_url, env("R2_PUBLIC_URL"));
        set(&mut r.region, env("R2_REGION"));

        let p = &mut self.processing;
        set(&mut p.hash_algorithm, env("CADCDN_HASH_ALGORITHM"));
        set(&mut p.output_dir, env("CADCDN_OUTPUT_DIR"));
        if let Some(raw) = env("CADCDN_HASH_LENGTH") {
            p.hash_length = raw.trim().parse().map_err(|_| {
                CdnError::InvalidConfig(format!("CADCDN_HASH_LENGTH is not a number: {}", raw))
            })?;
        }
        if let Some(raw) = env("CADCDN_GENERATE_MANIFEST") {
            p.generate_manifest = parse_bool("CADCDN_GENERATE_MANIFEST", &raw)?;
        }
        Ok(())
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CdnError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn temp_config(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cadcdn_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CdnConfig::resolve(&[], env_of(&[])).unwrap();
        assert_eq!(config.processing.hash_algorithm, "sha256");
        assert_eq!(config.processing.hash_length, 12);
        assert_eq!(config.processing.output_dir, "processed");
        assert!(config.processing.generate_manifest);
        assert_eq!(config.r2.bucket_name, "openarm-cad-assets");
        assert_eq!(config.r2.region, "auto");
        assert_eq!(config.cache.asset_max_age, 31_536_000);
    }

    #[test]
    fn test_load_config_from_file() {
        let path = temp_config(
            r#"
[processing]
hash_length = 16
output_dir = "dist"
parallel = true

[r2]
bucket_name = "robots"
public_url = "https://cdn.example.com/"

[cache]
manifest_max_age = 60
"#,
        );
        let config = CdnConfig::resolve(&[path.clone()], env_of(&[])).unwrap();

        assert_eq!(config.processing.hash_length, 16);
        assert_eq!(config.processing.output_dir, "dist");
        assert!(config.processing.parallel);
        assert_eq!(config.processing.hash_algorithm, "sha256");
        assert_eq!(config.r2.bucket_name, "robots");
        assert_eq!(config.r2.public_url, "https://cdn.example.com");
        assert_eq!(config.cache.manifest_max_age, 60);
        assert!(config.cache.asset_immutable);

        cleanup(&path);
    }

    #[test]
    fn test_later_file_wins() {
        let global = temp_config("[processing]\nhash_length = 10\noutput_dir = \"global\"\n");
        let project = temp_config("[processing]\noutput_dir = \"project\"\n");
        let config =
            CdnConfig::resolve(&[global.clone(), project.clone()], env_of(&[])).unwrap();

        assert_eq!(config.processing.hash_length, 10);
        assert_eq!(config.processing.output_dir, "project");

        cleanup(&global);
        cleanup(&project);
    }

    #[test]
    fn test_env_var_override() {
        let path = temp_config("[r2]\naccount_id = \"file-account\"\n[processing]\nhash_length = 16\n");
        let config = CdnConfig::resolve(
            &[path.clone()],
            env_of(&[
                ("R2_ACCOUNT_ID", "env-account"),
                ("CADCDN_HASH_LENGTH", "20"),
                ("CADCDN_GENERATE_MANIFEST", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.r2.account_id, "env-account");
        assert_eq!(config.processing.hash_length, 20);
        assert!(!config.processing.generate_manifest);

        cleanup(&path);
    }

    #[test]
    fn test_bad_env_values() {
        let err = CdnConfig::resolve(&[], env_of(&[("CADCDN_HASH_LENGTH", "twelve")])).unwrap_err();
        assert!(matches!(err, CdnError::InvalidConfig(_)));

        let err =
            CdnConfig::resolve(&[], env_of(&[("CADCDN_GENERATE_MANIFEST", "maybe")])).unwrap_err();
        assert!(matches!(err, CdnError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let path = temp_config("[processing]\nhash_lenght = 16\n");
        let err = CdnConfig::resolve(&[path.clone()], env_of(&[])).unwrap_err();
        assert!(matches!(err, CdnError::ConfigParse(_)));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_algorithm_fails_at_setup() {
        let config = CdnConfig::resolve(&[], env_of(&[("CADCDN_HASH_ALGORITHM", "md17")])).unwrap();
        let err = config.processing.hasher().err().unwrap();
        assert!(matches!(err, CdnError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_require_r2_reports_missing() {
        let config = CdnConfig::resolve(&[], env_of(&[("R2_ACCOUNT_ID", "acct")])).unwrap();
        match config.require_r2() {
            Err(CdnError::MissingConfig(missing)) => {
                assert_eq!(missing, vec!["R2_ACCESS_KEY_ID", "R2_SECRET_ACCESS_KEY"]);
            }
            other => panic!("expected MissingConfig, got {:?}", other),
        }

        let config = CdnConfig::resolve(
            &[],
            env_of(&[
                ("R2_ACCOUNT_ID", "acct"),
                ("R2_ACCESS_KEY_ID", "key"),
                ("R2_SECRET_ACCESS_KEY", "secret"),
            ]),
        )
        .unwrap();
        let r2 = config.require_r2().unwrap();
        assert_eq!(r2.endpoint_url(), "https://acct.r2.cloudflarestorage.com");
        assert_eq!(r2.cdn_url("manifest.json"), "https://assets.openarm.dev/manifest.json");
    }

    #[test]
    fn test_secret_is_redacted() {
        let r2 = R2Config {
            secret_access_key: "hunter2".to_string(),
            ..R2Config::default()
        };
        let debug = format!("{:?}", r2);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_cache_control_headers() {
        let cache = CacheConfig::default();
        assert_eq!(cache.asset_cache_control(), "public, max-age=31536000, immutable");
        assert_eq!(cache.manifest_cache_control(), "public, max-age=300");

        let mutable = CacheConfig {
            asset_immutable: false,
            asset_max_age: 3600,
            ..CacheConfig::default()
        };
        assert_eq!(mutable.asset_cache_control(), "public, max-age=3600");
    }
}
