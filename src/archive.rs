//! Archive path derivation — turns a To/From address pair plus date and
//! subject into the deterministic storage key for the sent copy.
//!
//! Layout: `Sent/<to domain>/<from domain>/<to user>/<from user>/<date> - <subject>/email`,
//! where `+` characters in the recipient local part become `/` so tag-style
//! addresses (`user+invoices+2024@…`) fan out into subfolders on their own.

use crate::address;
use crate::error::AddressError;

/// Leading segment of every archive key.
const ROOT_SEGMENT: &str = "Sent";

/// Terminal segment naming the stored object.
const LEAF_SEGMENT: &str = "email";

/// Derive the archive key for a sent message.
///
/// Deterministic in `(to, from, date, subject)`. The date and subject flow
/// through verbatim — no escaping or slash normalization is applied to them.
pub fn archive_path(
    to: &str,
    from: &str,
    date: &str,
    subject: &str,
) -> Result<String, AddressError> {
    let recipient = address::parse(to)?;
    let sender = address::parse(from)?;

    // Tag-style addressing: each + opens a subfolder under the recipient.
    let recipient_segments = recipient.user.replace('+', "/");
    let label = format!("{date} - {subject}");

    Ok([
        ROOT_SEGMENT,
        recipient.domain.as_str(),
        sender.domain.as_str(),
        recipient_segments.as_str(),
        sender.user.as_str(),
        label.as_str(),
        LEAF_SEGMENT,
    ]
    .join("/"))
}
