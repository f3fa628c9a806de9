//! S3 implementation of the storage gateway.

use async_trait::async_trait;
use aws_sdk_s3::{self as s3, error::SdkError, operation::get_object::GetObjectError};

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::gateway::StorageGateway;

/// Build an S3 client from the environment plus optional overrides.
///
/// A custom endpoint (S3-compatible stores) switches to path-style
/// addressing.
pub async fn build_client(config: &StorageConfig) -> s3::Client {
    let mut loader = aws_config::from_env();
    if let Some(region) = &config.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint.clone());
    }
    let sdk_config = loader.load().await;

    let mut builder = s3::config::Builder::from(&sdk_config);
    if config.endpoint.is_some() {
        builder = builder.force_path_style(true);
    }
    s3::Client::from_conf(builder.build())
}

/// Storage gateway over an S3 client.
pub struct S3Storage {
    client: s3::Client,
}

impl S3Storage {
    pub fn new(client: s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageGateway for S3Storage {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        tracing::trace!(bucket, key, command = "get_object");
        let output = match self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(SdkError::ServiceError(err)) => match err.err() {
                GetObjectError::NoSuchKey(_) => {
                    return Err(StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                e => {
                    return Err(StorageError::Access {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        reason: e.to_string(),
                    });
                }
            },
            Err(e) => {
                return Err(StorageError::Access {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Access {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(bucket, key, "Fetched object");
        Ok(body.to_vec())
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        tracing::trace!(bucket, key, size = body.len(), command = "put_object");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(s3::primitives::ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Access {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(bucket, key, "Stored object");
        Ok(())
    }
}
