//! Trigger-event model — the storage notification that starts a pipeline run.
//!
//! The notification is a JSON document with a `Records` array; each record
//! names one stored object via `s3.bucket.name` / `s3.object.key`. Exactly
//! one record is consumed per invocation.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::EventError;

/// A storage notification batch.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<ObjectRecord>,
}

/// One object reference within a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRecord {
    /// When the triggering store happened.
    #[serde(rename = "eventTime", default)]
    pub event_time: Option<DateTime<Utc>>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

impl TriggerEvent {
    /// Decode an event from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode an event from a reader (event file or stdin).
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, EventError> {
        let mut reader = reader;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_json(&buf)
    }

    /// The single record this invocation consumes.
    ///
    /// Additional records in the same batch are ignored; the pipeline logs
    /// how many were skipped.
    pub fn first_record(&self) -> Result<&ObjectRecord, EventError> {
        self.records.first().ok_or(EventError::Empty)
    }
}
