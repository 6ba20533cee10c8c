//! Client identifier classification and contact normalisation.
//!
//! Client identifiers arriving from the API or CLI are either a CRM/cache
//! primary key (UUID) or a free-form phone number / email address. The
//! distinction is made once, via [`Identifier::parse`], and threaded through
//! every lookup from there.

use std::fmt;

use uuid::Uuid;

/// A classified client identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Direct primary-key lookup against `manual_clients`, then `cached_clients`.
    ByKey(Uuid),
    /// Phone number or email, matched against order billing details.
    ByContact(String),
}

impl Identifier {
    /// Classifies a raw identifier.
    ///
    /// Only the canonical hyphenated 8-4-4-4-12 form (any letter case) counts
    /// as a key. Braced, `urn:uuid:` and compact 32-digit forms are treated
    /// as contact strings, as is everything else.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_canonical_uuid(trimmed) {
            if let Ok(id) = Uuid::try_parse(trimmed) {
                return Self::ByKey(id);
            }
        }
        Self::ByContact(trimmed.to_owned())
    }

    #[must_use]
    pub fn is_key(&self) -> bool {
        matches!(self, Self::ByKey(_))
    }

    /// `true` when the contact string looks like an email address.
    #[must_use]
    pub fn looks_like_email(&self) -> bool {
        matches!(self, Self::ByContact(s) if s.contains('@'))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByKey(id) => write!(f, "{id}"),
            Self::ByContact(s) => f.write_str(s),
        }
    }
}

fn is_canonical_uuid(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => *b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

/// Lowercases and trims an email address. Idempotent.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Removes all whitespace and hyphens from a phone number.
///
/// `"064 307-3023"` becomes `"0643073023"`.
#[must_use]
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Whether an order's billing phone or email matches a contact needle.
///
/// Phones compare after [`normalize_phone`]; emails compare
/// case-insensitively. Empty values never match.
#[must_use]
pub fn contact_matches(billing_phone: &str, billing_email: &str, needle: &str) -> bool {
    let needle_phone = normalize_phone(needle);
    if !needle_phone.is_empty() && normalize_phone(billing_phone) == needle_phone {
        return true;
    }
    let needle_email = normalize_email(needle);
    !needle_email.is_empty() && normalize_email(billing_email) == needle_email
}
