//! Store traits: the abstract interface for durable ledger state.
//!
//! The service root is generic over these traits so the same issuance and
//! sweep code runs on the filesystem and in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dis_ledger_core::{Keypair, PublicKey, Receipt, ReceiptId};

use crate::error::Result;

/// A named holding area for receipt files and documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Area {
    /// Freshly issued receipts.
    Generated,
    /// Legacy / unsigned receipts moved out by the sweep.
    Archive,
    /// Receipts that failed verification.
    Quarantine,
    /// Verification reports.
    Audits,
    /// Latest accepted receipt per peer.
    Peers,
}

impl Area {
    /// Every area, in layout order.
    pub const ALL: [Area; 5] = [
        Area::Generated,
        Area::Archive,
        Area::Quarantine,
        Area::Audits,
        Area::Peers,
    ];

    /// Directory name under the data root.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Area::Generated => "generated",
            Area::Archive => "archive",
            Area::Quarantine => "quarantine",
            Area::Audits => "audits",
            Area::Peers => "peers",
        }
    }
}

/// True if `name` is a plain file name: ASCII alphanumerics plus `-`, `_`
/// and `.`, not starting with a dot.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Durable receipt state.
///
/// # Design Notes
///
/// - **Dual persistence**: [`persist`](ReceiptStore::persist) writes the
///   individual file and appends one line to the log; both must succeed.
/// - **Atomic appends**: log lines are appended whole under an exclusive lock.
/// - **Idempotent moves**: relocating a file that is no longer in its source
///   area is a no-op returning `false`.
/// - **No sweep lock**: listing takes a snapshot; files written afterwards are
///   picked up by the next listing.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Receipt Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a newly issued receipt to `generated/` and the append log.
    async fn persist(&self, receipt: &Receipt) -> Result<()>;

    /// Load a receipt from `generated/` by id.
    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>>;

    /// All lines of the append log, oldest first.
    async fn log_lines(&self) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Area Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Names of the `.json` files in an area, sorted.
    async fn list(&self, area: Area) -> Result<Vec<String>>;

    /// Raw bytes of one file in an area.
    async fn read(&self, area: Area, name: &str) -> Result<Vec<u8>>;

    /// Write (or replace) a document in an area.
    async fn write(&self, area: Area, name: &str, bytes: &[u8]) -> Result<()>;

    /// Move a file between areas.
    ///
    /// Returns `false` without error if the file is not in `from`.
    async fn relocate(&self, name: &str, from: Area, to: Area) -> Result<bool>;

    /// Latest modification time across the `.json` files of an area.
    async fn latest_modified(&self, area: Area) -> Result<Option<DateTime<Utc>>>;

    /// Names of the `.json` files in an area modified strictly after `after`.
    async fn modified_after(&self, area: Area, after: DateTime<Utc>) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Marker Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// When the last completed sweep listed `generated/`, if any.
    async fn load_marker(&self) -> Result<Option<DateTime<Utc>>>;

    /// Persist the listing time of a completed sweep.
    async fn save_marker(&self, at: DateTime<Utc>) -> Result<()>;
}

/// Per-actor keypair lifecycle.
///
/// Keys are read-only after creation. Concurrent `ensure_keys` calls for
/// the same actor must return the same keypair.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Load the actor's keypair, generating and persisting one if absent.
    async fn ensure_keys(&self, actor: &str) -> Result<Keypair>;

    /// The actor's public key, without generating anything.
    async fn public_key(&self, actor: &str) -> Result<Option<PublicKey>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_dir_names_distinct() {
        let mut names: Vec<&str> = Area::ALL.iter().map(|a| a.dir_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Area::ALL.len());
    }

    #[test]
    fn test_safe_names() {
        assert!(is_safe_name("domain.terra"));
        assert!(is_safe_name("r-0a1b.json"));
        assert!(!is_safe_name("../keys"));
        assert!(!is_safe_name("a b"));
        assert!(!is_safe_name(".priv"));
        assert!(!is_safe_name(""));
    }
}
