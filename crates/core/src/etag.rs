//! Opaque document version tokens
//!
//! Every successful mutation of a document assigns a new [`ETag`].
//! ETags are drawn from a per-container counter, so within a container a
//! later mutation always carries a strictly greater ETag.
//!
//! Callers treat the token as opaque: they read it back from a response and
//! hand it to a conditional `replace`/`delete`. The textual form is a quoted
//! 16-digit hex string, as in an HTTP `ETag` header.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Version token assigned by the store on every mutation
///
/// ## Invariants
///
/// - Never zero for a stored document
/// - Strictly increasing across mutations within one container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ETag(u64);

impl ETag {
    /// Wrap a raw counter value
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        ETag(raw)
    }

    /// Raw counter value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{:016x}\"", self.0)
    }
}

impl FromStr for ETag {
    type Err = Error;

    /// Parse the textual form, with or without surrounding quotes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(trimmed);
        if inner.is_empty() {
            return Err(Error::invalid_input("empty etag"));
        }
        u64::from_str_radix(inner, 16)
            .map(ETag)
            .map_err(|_| Error::invalid_input(format!("malformed etag: {}", s)))
    }
}

impl From<ETag> for String {
    fn from(etag: ETag) -> Self {
        etag.to_string()
    }
}

impl TryFrom<String> for ETag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
