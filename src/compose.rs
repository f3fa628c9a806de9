//! Message composition — serializes a stored description into the
//! wire-format payload that is both relayed and archived.
//!
//! One compose call produces the bytes for both uses, so the archived copy
//! is byte-identical to what went over the wire.

use lettre::Message;
use lettre::address::{Address, Envelope};
use lettre::message::Mailbox;

use crate::address;
use crate::error::ComposeError;
use crate::message::MessageDescription;

/// Build the raw RFC 5322 payload for a message description.
pub fn compose(desc: &MessageDescription) -> Result<Vec<u8>, ComposeError> {
    let from = mailbox("from", &desc.from)?;
    let to = mailbox("to", &desc.to)?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(desc.subject.clone())
        .body(desc.body.clone().unwrap_or_default())?;

    Ok(message.formatted())
}

/// Build the relay envelope from the description's addressing fields.
///
/// Uses the same parsed To/From as the archive path; the envelope is never
/// re-extracted from the payload.
pub fn envelope(desc: &MessageDescription) -> Result<Envelope, ComposeError> {
    let from = plain_address("from", &desc.from)?;
    let to = plain_address("to", &desc.to)?;
    Ok(Envelope::new(Some(from), vec![to])?)
}

/// Parse a header into a mailbox, falling back to the first extracted
/// address when the strict parser rejects it (address lists, stray text).
fn mailbox(field: &'static str, raw: &str) -> Result<Mailbox, ComposeError> {
    if let Ok(mbox) = raw.parse::<Mailbox>() {
        return Ok(mbox);
    }
    Ok(Mailbox::new(None, plain_address(field, raw)?))
}

fn plain_address(field: &'static str, raw: &str) -> Result<Address, ComposeError> {
    let parts = address::parse(raw).map_err(|e| ComposeError::Mailbox {
        field,
        reason: e.to_string(),
    })?;
    Address::new(parts.user.as_str(), parts.domain.as_str()).map_err(|e| ComposeError::Mailbox {
        field,
        reason: e.to_string(),
    })
}
