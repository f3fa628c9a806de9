//! Header address extraction — pulls the first email address out of a raw
//! To/From header and splits it into local part and domain.
//!
//! This is deliberately not an RFC 5322 validator: a simplified pattern is
//! enough to locate the address inside display names and stray text, and
//! malformed headers must fail loudly rather than yield empty parts.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::AddressError;

/// Local part and domain of one extracted address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParts {
    pub user: String,
    pub domain: String,
}

/// Simplified address pattern: local part of letters/digits/hyphen/plus up
/// to 30 chars, `@`, domain of letters/digits/hyphen/dot up to 65 chars,
/// a dot, and a TLD of 1+ letters. Case-insensitive. `+` stays in the local
/// part so tag-style addressing survives into the archive path.
fn address_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9+-]{1,30}@[a-z0-9.-]{1,65}\.[a-z]+").unwrap()
    })
}

/// Extract the first address from a raw header string.
///
/// The header may contain display names or multiple addresses; only the
/// first match is used. Returns `AddressError::NotFound` when nothing in
/// the header matches — never partially-filled parts.
pub fn parse(header: &str) -> Result<AddressParts, AddressError> {
    let matched = address_regex()
        .find(header)
        .ok_or_else(|| AddressError::NotFound {
            header: header.to_string(),
        })?;

    // The pattern admits exactly one `@` per match.
    let (user, domain) = matched
        .as_str()
        .split_once('@')
        .ok_or_else(|| AddressError::NotFound {
            header: header.to_string(),
        })?;

    Ok(AddressParts {
        user: user.to_string(),
        domain: domain.to_string(),
    })
}
