//! SMTP implementation of the relay gateway, via lettre.

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

use crate::config::SmtpConfig;
use crate::error::RelayError;
use crate::gateway::RelayGateway;

/// Relay gateway over a TLS SMTP transport.
pub struct SmtpRelay {
    transport: SmtpTransport,
}

impl SmtpRelay {
    /// Build the transport once at startup.
    pub fn new(config: &SmtpConfig) -> Result<Self, RelayError> {
        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| RelayError::Transport {
                host: config.host.clone(),
                reason: e.to_string(),
            })?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl RelayGateway for SmtpRelay {
    async fn send(&self, envelope: &Envelope, raw: &[u8]) -> Result<(), RelayError> {
        self.transport
            .send_raw(envelope, raw)
            .map_err(|e| RelayError::Send {
                reason: e.to_string(),
            })?;

        tracing::info!(
            to = ?envelope.to().iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Message relayed"
        );
        Ok(())
    }
}
