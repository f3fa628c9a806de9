//! The structured message description stored in the outbox bucket.

use serde::{Deserialize, Serialize};

/// A queued outbound message, as stored by the producer.
///
/// Only the addressing fields are interpreted here; anything else the
/// producer wrote rides along opaquely in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDescription {
    /// Raw To header text (may include a display name).
    pub to: String,
    /// Raw From header text.
    pub from: String,
    pub subject: String,
    /// Date label used in the archive path. Flows through verbatim.
    pub date: String,
    /// Plain-text body. Absent composes as an empty body.
    #[serde(default)]
    pub body: Option<String>,
    /// Producer fields this pipeline does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_required_fields() {
        let desc: MessageDescription = serde_json::from_str(
            r#"{"to": "a@b.com", "from": "c@d.org", "subject": "Hi", "date": "2024-01-05"}"#,
        )
        .unwrap();
        assert_eq!(desc.to, "a@b.com");
        assert_eq!(desc.subject, "Hi");
        assert!(desc.body.is_none());
        assert!(desc.extra.is_empty());
    }

    #[test]
    fn preserves_unknown_fields() {
        let desc: MessageDescription = serde_json::from_str(
            r#"{"to": "a@b.com", "from": "c@d.org", "subject": "Hi", "date": "2024-01-05",
                "body": "hello", "headers": {"X-Queue": "outbound"}, "priority": 3}"#,
        )
        .unwrap();
        assert_eq!(desc.body.as_deref(), Some("hello"));
        assert_eq!(desc.extra["priority"], 3);
        assert_eq!(desc.extra["headers"]["X-Queue"], "outbound");
    }

    #[test]
    fn missing_required_field_fails() {
        let err = serde_json::from_str::<MessageDescription>(
            r#"{"to": "a@b.com", "subject": "Hi", "date": "2024-01-05"}"#,
        );
        assert!(err.is_err());
    }
}
