//! # DIS Ledger Store
//!
//! Durable state for the receipt ledger, behind async traits so the service
//! root can run against the filesystem in production and memory in tests.
//!
//! ## Key Types
//!
//! - [`ReceiptStore`] - Receipt files by area, the append log, audit documents,
//!   and the last-verification marker
//! - [`KeyStore`] - Lazily created per-actor Ed25519 keypairs
//! - [`FsStore`] / [`FsKeyStore`] - Filesystem implementations
//! - [`MemoryStore`] / [`MemoryKeyStore`] - In-memory implementations for tests
//!
//! ## On-disk Layout
//!
//! ```text
//! <data_dir>/
//!   generated/<receipt_id>.json   individually addressable receipts
//!   archive/                      legacy / unsigned receipts moved by the sweep
//!   quarantine/                   receipts that failed verification
//!   audits/verify_<stamp>.json    verification reports
//!   peers/<peer>.json             latest accepted receipt per peer
//!   keys/<actor>.priv|.pub        base64 key material
//!   ledger.jsonl                  append-only log, one receipt per line
//!   last_verification.txt         RFC 3339 marker
//! ```

pub mod error;
pub mod fs;
pub mod keystore;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use keystore::{FsKeyStore, MemoryKeyStore};
pub use memory::MemoryStore;
pub use traits::{is_safe_name, Area, KeyStore, ReceiptStore};
