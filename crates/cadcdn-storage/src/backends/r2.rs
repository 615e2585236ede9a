//! Cloudflare R2 backend using the AWS S3 SDK.
//!
//! R2 speaks the S3 API at `https://<account>.r2.cloudflarestorage.com`.
//! The SDK is async; this client owns a single-threaded tokio runtime and
//! blocks on each request so callers stay synchronous. Transient failures
//! are retried by the SDK's standard retry policy.

use crate::client::StorageClient;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use cadcdn_core::{CdnError, R2Config, Result};
use cadcdn_asset::PRODUCER;
use std::fmt;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

/// S3-compatible client for a single R2 bucket
pub struct R2StorageClient {
    client: Client,
    bucket: String,
    runtime: Runtime,
}

impl fmt::Debug for R2StorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2StorageClient")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl R2StorageClient {
    /// Create a client from validated R2 settings
    pub fn new(config: &R2Config) -> Result<Self> {
        let missing = config.validate();
        if !missing.is_empty() {
            return Err(CdnError::MissingConfig(missing));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None, // session token
            None, // expiration
            "cadcdn-config",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket_name.clone(),
            runtime,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put(
        &self,
        body: impl std::future::Future<Output = Result<ByteStream>>,
        key: &str,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.runtime.block_on(async {
            let body = body.await?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .content_type(content_type)
                .cache_control(cache_control)
                .metadata("source", PRODUCER)
                .send()
                .await
                .map_err(|e| {
                    CdnError::Storage(format!(
                        "Failed to upload {} to {}: {}",
                        key,
                        self.bucket,
                        DisplayErrorContext(&e)
                    ))
                })?;
            Ok(())
        })
    }
}

impl StorageClient for R2StorageClient {
    fn name(&self) -> &str {
        "r2"
    }

    #[instrument(skip(self), fields(backend = "r2"))]
    fn upload_file(
        &self,
        local_path: &Path,
        remote_key: &str,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        if !local_path.exists() {
            return Err(CdnError::NotFound(local_path.to_path_buf()));
        }
        let body = async {
            ByteStream::from_path(local_path).await.map_err(|e| {
                CdnError::Storage(format!("Failed to read {}: {}", local_path.display(), e))
            })
        };
        self.put(body, remote_key, content_type, cache_control)?;
        debug!(key = %remote_key, "Uploaded file");
        Ok(())
    }

    #[instrument(skip(self, content), fields(backend = "r2", size = content.len()))]
    fn upload_bytes(
        &self,
        content: &[u8],
        remote_key: &str,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        let body = ByteStream::from(content.to_vec());
        self.put(async { Ok(body) }, remote_key, content_type, cache_control)?;
        debug!(key = %remote_key, "Uploaded bytes");
        Ok(())
    }
}
