//! # DIS Ledger
//!
//! The receipt ledger of a DIS governance node: every consequential action is
//! turned into a signed, content-addressed receipt, persisted twice, and
//! re-checked by a periodic verification sweep.
//!
//! ## Overview
//!
//! - **Issuance**: sign with the actor's lazily created key, write the
//!   receipt file and append it to the log
//! - **Verification sweep**: classify every receipt as valid, legacy,
//!   tampered or unreadable; archive or quarantine accordingly; sign the report
//! - **Scheduler**: skip-aware periodic sweep plus a heartbeat pushing the
//!   latest report receipt to trusted peers
//! - **Peer acceptance**: verify inbound receipts under locally configured keys
//!
//! ## Key Concepts
//!
//! - **Receipt**: Immutable. Never edited. Corrections are new receipts that
//!   supersede the original.
//! - **Archive**: Receipts without an embedded key. Legacy, not tampered.
//! - **Quarantine**: Receipts whose signature or hash does not verify.
//! - **Meta-receipt**: The signed receipt wrapping each sweep's report.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dis_ledger::{Ledger, LedgerConfig};
//!
//! async fn example() -> dis_ledger::Result<()> {
//!     let ledger = Ledger::open(LedgerConfig::default()).await?;
//!
//!     let receipt = ledger
//!         .freeze("uid-terracouncil-001", ["4f1c...", "9ab2..."])
//!         .await?;
//!     println!("issued {}", receipt.receipt_id);
//!
//!     let sweep = ledger.verify_all().await?;
//!     println!("{} valid of {}", sweep.report.valid, sweep.report.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `dis_ledger::core` - Receipts, hashing, signing
//! - `dis_ledger::store` - Storage traits and filesystem/memory stores
//! - `dis_ledger::sync` - Heartbeat, peer verification, trust ledger

pub mod config;
pub mod error;
pub mod issuer;
pub mod ledger;
pub mod scheduler;
pub mod sweep;

// Re-export component crates
pub use dis_ledger_core as core;
pub use dis_ledger_store as store;
pub use dis_ledger_sync as sync;

pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, Result};
pub use issuer::{IssueRequest, Issuer};
pub use ledger::Ledger;
pub use scheduler::{Scheduler, SweepOutcome};
pub use sweep::{
    Sweeper, SweepOutput, VerificationReport, VerificationResult, VerificationStatus,
};

// Re-export commonly used core types
pub use dis_ledger_core::{Keypair, Provenance, PublicKey, Receipt, ReceiptId, VerifyError};
