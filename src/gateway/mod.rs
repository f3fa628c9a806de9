//! Gateway abstractions for the two external services the pipeline talks
//! to: object storage and the mail relay.
//!
//! The pipeline depends only on these traits; production wiring injects the
//! S3 and SMTP implementations, tests inject recording stubs.

pub mod s3;
pub mod smtp;

use async_trait::async_trait;
use lettre::address::Envelope;

use crate::error::{RelayError, StorageError};

pub use s3::S3Storage;
pub use smtp::SmtpRelay;

/// Object storage — get/put by bucket and key.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Fetch an object. `StorageError::NotFound` when the key is absent.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store an object, overwriting anything already at `key`.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError>;
}

/// Mail relay — sends one raw message, at most once, no retry.
#[async_trait]
pub trait RelayGateway: Send + Sync {
    async fn send(&self, envelope: &Envelope, raw: &[u8]) -> Result<(), RelayError>;
}
