//! Error types for the outbox relay.

/// Top-level error type for a pipeline invocation.
///
/// Every stage failure collapses into one of these variants; the pipeline
/// logs the detail and reports only success/failure to its trigger.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Invalid message description: {0}")]
    Description(#[from] serde_json::Error),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
}

/// Configuration-related errors. Raised at startup, never per-message.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Trigger-event decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Failed to parse trigger event: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Trigger event contains no object records")]
    Empty,

    #[error("Failed to read trigger event: {0}")]
    Io(#[from] std::io::Error),
}

/// Header address extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("No email address found in header: {header:?}")]
    NotFound { header: String },
}

/// Message composition errors.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Invalid {field} mailbox: {reason}")]
    Mailbox { field: &'static str, reason: String },

    #[error("Failed to assemble message: {0}")]
    Assemble(#[from] lettre::error::Error),
}

/// Object storage errors (get/put).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Storage access failed for {bucket}/{key}: {reason}")]
    Access {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// Mail relay errors (transport construction and send).
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to build relay transport for {host}: {reason}")]
    Transport { host: String, reason: String },

    #[error("Relay send failed: {reason}")]
    Send { reason: String },
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
