//! Configuration, built from environment variables at startup.
//!
//! A missing archive bucket or relay host fails startup; it is never
//! surfaced as a per-message error.

use crate::error::ConfigError;

/// Default SMTP submission port.
const DEFAULT_SMTP_PORT: u16 = 587;

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket receiving the archived copy of every sent message.
    pub archive_bucket: String,
    /// Object storage client settings.
    pub storage: StorageConfig,
    /// Mail relay settings.
    pub smtp: SmtpConfig,
}

/// Object storage client settings.
///
/// Both fields are optional: when unset, the AWS SDK falls back to its
/// usual environment/profile resolution chain.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Region override.
    pub region: Option<String>,
    /// Custom endpoint (S3-compatible stores). Implies path-style addressing.
    pub endpoint: Option<String>,
}

/// Mail relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Config {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let archive_bucket = require_env("OUTBOX_ARCHIVE_BUCKET")?;

        let storage = StorageConfig {
            region: std::env::var("OUTBOX_S3_REGION").ok(),
            endpoint: std::env::var("OUTBOX_S3_ENDPOINT").ok(),
        };

        let host = require_env("OUTBOX_SMTP_HOST")?;
        let port = match std::env::var("OUTBOX_SMTP_PORT") {
            Ok(raw) => parse_port("OUTBOX_SMTP_PORT", &raw)?,
            Err(_) => DEFAULT_SMTP_PORT,
        };
        let username = std::env::var("OUTBOX_SMTP_USERNAME").unwrap_or_default();
        let password = std::env::var("OUTBOX_SMTP_PASSWORD").unwrap_or_default();

        Ok(Self {
            archive_bucket,
            storage,
            smtp: SmtpConfig {
                host,
                port,
                username,
                password,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn parse_port(key: &str, raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("not a valid port number: {raw:?}"),
    })
}
