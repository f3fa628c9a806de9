//! The five-stage relay pipeline.
//!
//! Every invocation flows through:
//! 1. Fetch — load the stored message description
//! 2. Extract — derive the archive path from its addressing
//! 3. Compose — serialize the wire-format payload
//! 4. Relay — send the payload through the mail relay
//! 5. Archive — store the sent copy under the derived path
//!
//! Stages run strictly in order; the first failure short-circuits the rest.
//! There is no rollback: a relayed-but-unarchived message stays sent.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::archive;
use crate::compose;
use crate::error::Result;
use crate::event::{ObjectRecord, TriggerEvent};
use crate::gateway::{RelayGateway, StorageGateway};
use crate::message::MessageDescription;

/// Where an invocation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Completed,
    Failed,
}

/// Per-invocation state threaded through the stages.
///
/// Created once per trigger, mutated additively (stages only fill fields
/// in), discarded when the run settles.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub source_bucket: String,
    pub source_key: String,
    /// Parsed message description. Set by Fetch.
    pub description: Option<MessageDescription>,
    /// Wire-format payload. Set by Compose; read by Relay and Archive.
    pub raw_payload: Vec<u8>,
    /// Derived storage key for the sent copy. Set by Extract.
    pub archive_path: String,
    pub destination_bucket: String,
    pub state: PipelineState,
}

impl PipelineContext {
    pub fn new(record: &ObjectRecord, destination_bucket: String) -> Self {
        Self {
            source_bucket: record.s3.bucket.name.clone(),
            source_key: record.s3.object.key.clone(),
            description: None,
            raw_payload: Vec::new(),
            archive_path: String::new(),
            destination_bucket,
            state: PipelineState::Pending,
        }
    }
}

/// Pipeline orchestrator with injected gateways.
pub struct Pipeline {
    storage: Arc<dyn StorageGateway>,
    relay: Arc<dyn RelayGateway>,
    archive_bucket: String,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        relay: Arc<dyn RelayGateway>,
        archive_bucket: String,
    ) -> Self {
        Self {
            storage,
            relay,
            archive_bucket,
        }
    }

    /// Handle one trigger event.
    ///
    /// The outward contract is a bare success flag: error detail lands in
    /// the log, never in the return value. Only the first record of the
    /// batch is consumed.
    pub async fn handle(&self, event: &TriggerEvent) -> bool {
        let invocation = Uuid::new_v4();

        let record = match event.first_record() {
            Ok(record) => record,
            Err(e) => {
                error!(%invocation, error = %e, "Rejecting trigger event");
                return false;
            }
        };
        if event.records.len() > 1 {
            warn!(
                %invocation,
                skipped = event.records.len() - 1,
                "Ignoring additional records in trigger batch"
            );
        }

        let mut ctx = PipelineContext::new(record, self.archive_bucket.clone());
        info!(
            %invocation,
            bucket = %ctx.source_bucket,
            key = %ctx.source_key,
            "Pipeline started"
        );

        match self.run(&mut ctx).await {
            Ok(()) => {
                info!(%invocation, archive_path = %ctx.archive_path, "Pipeline completed");
                true
            }
            Err(e) => {
                error!(%invocation, error = %e, "Pipeline failed");
                false
            }
        }
    }

    /// Run the stage chain over one context, settling its terminal state.
    pub async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        match self.execute(ctx).await {
            Ok(()) => {
                ctx.state = PipelineState::Completed;
                Ok(())
            }
            Err(e) => {
                ctx.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<()> {
        let desc = self.fetch(ctx).await?;
        self.extract(ctx, &desc)?;
        self.compose(ctx, &desc)?;
        self.relay(ctx, &desc).await?;
        self.archive(ctx).await?;
        Ok(())
    }

    /// Stage 1: load and parse the stored message description.
    async fn fetch(&self, ctx: &mut PipelineContext) -> Result<MessageDescription> {
        info!(stage = "fetch", bucket = %ctx.source_bucket, key = %ctx.source_key, "Loading message");
        let bytes = self.storage.get(&ctx.source_bucket, &ctx.source_key).await?;
        let desc: MessageDescription = serde_json::from_slice(&bytes)?;
        ctx.description = Some(desc.clone());
        Ok(desc)
    }

    /// Stage 2: derive the archive path. Pure.
    fn extract(&self, ctx: &mut PipelineContext, desc: &MessageDescription) -> Result<()> {
        info!(stage = "extract", to = %desc.to, from = %desc.from, "Deriving archive path");
        ctx.archive_path = archive::archive_path(&desc.to, &desc.from, &desc.date, &desc.subject)?;
        Ok(())
    }

    /// Stage 3: serialize the wire-format payload. Pure.
    fn compose(&self, ctx: &mut PipelineContext, desc: &MessageDescription) -> Result<()> {
        info!(stage = "compose", subject = %desc.subject, "Composing raw message");
        ctx.raw_payload = compose::compose(desc)?;
        Ok(())
    }

    /// Stage 4: send the payload. At most once, no retry.
    async fn relay(&self, ctx: &PipelineContext, desc: &MessageDescription) -> Result<()> {
        info!(stage = "relay", size = ctx.raw_payload.len(), "Sending message");
        let envelope = compose::envelope(desc)?;
        self.relay.send(&envelope, &ctx.raw_payload).await?;
        Ok(())
    }

    /// Stage 5: store the sent copy under the derived path.
    async fn archive(&self, ctx: &PipelineContext) -> Result<()> {
        info!(
            stage = "archive",
            bucket = %ctx.destination_bucket,
            key = %ctx.archive_path,
            "Archiving sent copy"
        );
        self.storage
            .put(
                &ctx.destination_bucket,
                &ctx.archive_path,
                ctx.raw_payload.clone(),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::result::Result;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use lettre::address::Envelope;

    use super::*;
    use crate::error::{Error, RelayError, StorageError};

    // ── Recording test doubles ──────────────────────────────────────

    #[derive(Default)]
    struct RecordingStorage {
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
        gets: Mutex<Vec<(String, String)>>,
        puts: Mutex<Vec<(String, String, Vec<u8>)>>,
        fail_put: bool,
    }

    impl RecordingStorage {
        fn with_object(bucket: &str, key: &str, body: &[u8]) -> Self {
            let storage = Self::default();
            storage
                .objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), key.to_string()), body.to_vec());
            storage
        }

        fn failing_puts(mut self) -> Self {
            self.fail_put = true;
            self
        }
    }

    #[async_trait]
    impl StorageGateway for RecordingStorage {
        async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
            self.gets
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string()));
            self.objects
                .lock()
                .unwrap()
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
        }

        async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
            if self.fail_put {
                return Err(StorageError::Access {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    reason: "simulated write failure".to_string(),
                });
            }
            self.puts
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string(), body));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRelay {
        sends: Mutex<Vec<(Envelope, Vec<u8>)>>,
        fail: bool,
    }

    impl RecordingRelay {
        fn failing() -> Self {
            Self {
                sends: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl RelayGateway for RecordingRelay {
        async fn send(&self, envelope: &Envelope, raw: &[u8]) -> Result<(), RelayError> {
            if self.fail {
                return Err(RelayError::Send {
                    reason: "simulated quota failure".to_string(),
                });
            }
            self.sends
                .lock()
                .unwrap()
                .push((envelope.clone(), raw.to_vec()));
            Ok(())
        }
    }

    // ── Fixtures ────────────────────────────────────────────────────

    const ARCHIVE_BUCKET: &str = "mail-archive";
    const SOURCE_BUCKET: &str = "outbox";
    const SOURCE_KEY: &str = "queued/msg-001.json";

    const EXPECTED_PATH: &str =
        "Sent/example.com/acme.co/user/tag/sender/2024-01-05 - Hello/email";

    fn description_json() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "to": "Jane Doe <user+tag@example.com>",
            "from": "sender@acme.co",
            "subject": "Hello",
            "date": "2024-01-05",
            "body": "Hi Jane",
        }))
        .unwrap()
    }

    fn trigger_event() -> TriggerEvent {
        serde_json::from_value(serde_json::json!({
            "Records": [
                {"s3": {"bucket": {"name": SOURCE_BUCKET}, "object": {"key": SOURCE_KEY}}}
            ]
        }))
        .unwrap()
    }

    fn pipeline(
        storage: RecordingStorage,
        relay: RecordingRelay,
    ) -> (Pipeline, Arc<RecordingStorage>, Arc<RecordingRelay>) {
        let storage = Arc::new(storage);
        let relay = Arc::new(relay);
        let pipeline = Pipeline::new(
            Arc::clone(&storage) as Arc<dyn StorageGateway>,
            Arc::clone(&relay) as Arc<dyn RelayGateway>,
            ARCHIVE_BUCKET.to_string(),
        );
        (pipeline, storage, relay)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn successful_run_sends_then_archives() {
        let storage = RecordingStorage::with_object(SOURCE_BUCKET, SOURCE_KEY, &description_json());
        let (pipeline, storage, relay) = pipeline(storage, RecordingRelay::default());

        assert!(pipeline.handle(&trigger_event()).await);

        let gets = storage.gets.lock().unwrap();
        assert_eq!(gets.as_slice(), &[(SOURCE_BUCKET.to_string(), SOURCE_KEY.to_string())]);

        let sends = relay.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);

        let puts = storage.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        let (bucket, key, body) = &puts[0];
        assert_eq!(bucket, ARCHIVE_BUCKET);
        assert_eq!(key, EXPECTED_PATH);

        // The archived copy is byte-identical to what was relayed.
        assert_eq!(body, &sends[0].1);
    }

    #[tokio::test]
    async fn fetch_failure_skips_relay_and_archive() {
        let (pipeline, storage, relay) =
            pipeline(RecordingStorage::default(), RecordingRelay::default());

        assert!(!pipeline.handle(&trigger_event()).await);

        assert_eq!(storage.gets.lock().unwrap().len(), 1);
        assert!(relay.sends.lock().unwrap().is_empty());
        assert!(storage.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn relay_failure_skips_archive_and_keeps_context() {
        let storage = RecordingStorage::with_object(SOURCE_BUCKET, SOURCE_KEY, &description_json());
        let (pipeline, storage, _relay) = pipeline(storage, RecordingRelay::failing());

        let event = trigger_event();
        let mut ctx =
            PipelineContext::new(event.first_record().unwrap(), ARCHIVE_BUCKET.to_string());
        let err = pipeline.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Error::Relay(_)));

        // Earlier stage results survive the failure untouched.
        assert_eq!(ctx.state, PipelineState::Failed);
        assert_eq!(ctx.archive_path, EXPECTED_PATH);
        assert!(!ctx.raw_payload.is_empty());
        assert!(ctx.description.is_some());

        assert!(storage.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_to_header_fails_before_any_send() {
        let body = serde_json::to_vec(&serde_json::json!({
            "to": "jane doe example com",
            "from": "sender@acme.co",
            "subject": "Hello",
            "date": "2024-01-05",
        }))
        .unwrap();
        let storage = RecordingStorage::with_object(SOURCE_BUCKET, SOURCE_KEY, &body);
        let (pipeline, storage, relay) = pipeline(storage, RecordingRelay::default());

        assert!(!pipeline.handle(&trigger_event()).await);

        assert!(relay.sends.lock().unwrap().is_empty());
        assert!(storage.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_description_json_fails_fetch() {
        let storage = RecordingStorage::with_object(SOURCE_BUCKET, SOURCE_KEY, b"not json at all");
        let (pipeline, _storage, relay) = pipeline(storage, RecordingRelay::default());

        assert!(!pipeline.handle(&trigger_event()).await);
        assert!(relay.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn archive_failure_reports_false_after_send() {
        let storage = RecordingStorage::with_object(SOURCE_BUCKET, SOURCE_KEY, &description_json())
            .failing_puts();
        let (pipeline, _storage, relay) = pipeline(storage, RecordingRelay::default());

        // The message went out; the failed archive still fails the run.
        assert!(!pipeline.handle(&trigger_event()).await);
        assert_eq!(relay.sends.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_event_fails_without_gateway_calls() {
        let (pipeline, storage, relay) =
            pipeline(RecordingStorage::default(), RecordingRelay::default());

        let event: TriggerEvent = serde_json::from_value(serde_json::json!({"Records": []})).unwrap();
        assert!(!pipeline.handle(&event).await);

        assert!(storage.gets.lock().unwrap().is_empty());
        assert!(relay.sends.lock().unwrap().is_empty());
        assert!(storage.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_first_record_is_consumed() {
        let storage = RecordingStorage::with_object(SOURCE_BUCKET, SOURCE_KEY, &description_json());
        let (pipeline, storage, _relay) = pipeline(storage, RecordingRelay::default());

        let event: TriggerEvent = serde_json::from_value(serde_json::json!({
            "Records": [
                {"s3": {"bucket": {"name": SOURCE_BUCKET}, "object": {"key": SOURCE_KEY}}},
                {"s3": {"bucket": {"name": SOURCE_BUCKET}, "object": {"key": "queued/msg-002.json"}}}
            ]
        }))
        .unwrap();

        assert!(pipeline.handle(&event).await);

        let gets = storage.gets.lock().unwrap();
        assert_eq!(gets.len(), 1);
        assert_eq!(gets[0].1, SOURCE_KEY);
    }

    #[tokio::test]
    async fn context_starts_pending_and_completes() {
        let storage = RecordingStorage::with_object(SOURCE_BUCKET, SOURCE_KEY, &description_json());
        let (pipeline, _storage, _relay) = pipeline(storage, RecordingRelay::default());

        let event = trigger_event();
        let mut ctx =
            PipelineContext::new(event.first_record().unwrap(), ARCHIVE_BUCKET.to_string());
        assert_eq!(ctx.state, PipelineState::Pending);

        pipeline.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.state, PipelineState::Completed);
        assert_eq!(ctx.destination_bucket, ARCHIVE_BUCKET);
    }
}
