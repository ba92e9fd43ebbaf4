#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Object storage for downloadable publications.
//!
//! Lists the objects in the publication bucket and issues time-limited
//! presigned download URLs. Any S3-compatible endpoint works.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `STORAGE_ENDPOINT` | Yes | S3-compatible endpoint URL |
//! | `STORAGE_BUCKET` | Yes | Bucket holding the publications |
//! | `STORAGE_ACCESS_KEY_ID` | Yes | Access key |
//! | `STORAGE_SECRET_ACCESS_KEY` | Yes | Secret key |
//! | `STORAGE_REGION` | No | Signing region (default `auto`) |

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};
use aws_sdk_s3::presigning::PresigningConfig;

/// Default lifetime of a presigned URL, in seconds.
pub const DEFAULT_EXPIRY_SECS: u64 = 3600;

/// Shortest allowed presigned URL lifetime, in seconds.
pub const MIN_EXPIRY_SECS: u64 = 60;

/// Longest allowed presigned URL lifetime (seven days), in seconds.
pub const MAX_EXPIRY_SECS: u64 = 604_800;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// `ListObjectsV2` failed.
    #[error("Failed to list s3://{bucket}/{prefix}: {source}")]
    List {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Presigning a `GetObject` request failed.
    #[error("Failed to presign s3://{bucket}/{key}: {source}")]
    Presign {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The requested object does not exist.
    #[error("Object not found: {key}")]
    NotFound {
        /// Object key.
        key: String,
    },
}

/// Clamps a requested URL lifetime to the allowed range.
#[must_use]
pub fn presign_expiry(requested_secs: Option<u64>) -> Duration {
    Duration::from_secs(
        requested_secs
            .unwrap_or(DEFAULT_EXPIRY_SECS)
            .clamp(MIN_EXPIRY_SECS, MAX_EXPIRY_SECS),
    )
}

/// Read access to a bucket of downloadable objects.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Lists every key under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the listing fails.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Issues a presigned GET URL for `key` valid for `expires_in`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the URL cannot be signed.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;
}

/// S3-compatible storage client.
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Storage {
    /// Creates a client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingEnv`] if any required variable is unset.
    pub fn from_env() -> Result<Self, StorageError> {
        let endpoint = require_env("STORAGE_ENDPOINT")?;
        let bucket = require_env("STORAGE_BUCKET")?;
        let access_key = require_env("STORAGE_ACCESS_KEY_ID")?;
        let secret_key = require_env("STORAGE_SECRET_ACCESS_KEY")?;
        let region = std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string());

        let creds = Credentials::new(&access_key, &secret_key, None, None, "statmap-env");

        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(&endpoint)
            .region(Region::new(region))
            .credentials_provider(creds)
            .force_path_style(true)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .build();

        log::info!("Object storage configured for bucket '{bucket}' at {endpoint}");

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket,
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        log::debug!("Listing s3://{}/{prefix}*", self.bucket);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| StorageError::List {
                bucket: self.bucket.clone(),
                prefix: prefix.to_string(),
                source: Box::new(e),
            })?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(String::from)),
            );

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        log::debug!("  found {} objects", keys.len());
        Ok(keys)
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let presign_error = |e: Box<dyn std::error::Error + Send + Sync>| StorageError::Presign {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source: e,
        };

        let config = PresigningConfig::expires_in(expires_in).map_err(|e| presign_error(e.into()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| presign_error(e.into()))?;

        Ok(request.uri().to_string())
    }
}

/// In-memory storage with fake signed URLs, for tests and local runs
/// without a bucket.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    keys: BTreeSet<String>,
}

impl MemoryStorage {
    /// Creates storage holding `keys`.
    #[must_use]
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .keys
            .iter()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        if !self.keys.contains(key) {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(format!(
            "memory://{key}?expires={}",
            expires_in.as_secs()
        ))
    }
}

fn require_env(name: &str) -> Result<String, StorageError> {
    std::env::var(name).map_err(|_| StorageError::MissingEnv {
        name: name.to_string(),
    })
}
