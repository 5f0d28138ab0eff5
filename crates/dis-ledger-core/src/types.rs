//! Identifier and timestamp types.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Prefix of every generated receipt id.
pub const RECEIPT_ID_PREFIX: &str = "r-";

/// Opaque receipt identifier.
///
/// Freshly issued ids are `r-` followed by 32 lowercase hex characters
/// (16 random bytes). Ids read back from disk are kept verbatim so legacy
/// receipts with other id shapes still load.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Generate a new random id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("{RECEIPT_ID_PREFIX}{}", hex::encode(bytes)))
    }

    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the id is empty (field missing on disk).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File name of the individually addressable receipt file.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Debug for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiptId({})", self.0)
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReceiptId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Format a UTC instant as RFC 3339 with nanosecond precision and `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// The current UTC time in receipt timestamp format.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::DecodingError(format!("timestamp {s:?}: {e}")))
}
