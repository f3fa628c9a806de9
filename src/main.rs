use std::sync::Arc;

use anyhow::Context;

use outbox_relay::config::Config;
use outbox_relay::event::TriggerEvent;
use outbox_relay::gateway::{self, S3Storage, SmtpRelay};
use outbox_relay::pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("configuration")?;

    let s3_client = gateway::s3::build_client(&config.storage).await;
    let storage = Arc::new(S3Storage::new(s3_client));
    let relay = Arc::new(SmtpRelay::new(&config.smtp).context("relay transport")?);

    let event = load_event(std::env::args().nth(1)).context("trigger event")?;

    let pipeline = Pipeline::new(storage, relay, config.archive_bucket);
    let ok = pipeline.handle(&event).await;

    std::process::exit(if ok { 0 } else { 1 });
}

/// Load the trigger event from the given path, or stdin when none is given.
fn load_event(path: Option<String>) -> anyhow::Result<TriggerEvent> {
    let event = match path {
        Some(path) => {
            let file = std::fs::File::open(&path).with_context(|| format!("open {path}"))?;
            TriggerEvent::from_reader(file)?
        }
        None => TriggerEvent::from_reader(std::io::stdin().lock())?,
    };
    Ok(event)
}
