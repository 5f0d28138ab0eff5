//! Error types for the ledger service.

use dis_ledger_core::CoreError;
use dis_ledger_store::StoreError;
use dis_ledger_sync::SyncError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The actor's signing key could not be loaded or created.
    #[error("cannot sign for {actor}: {source}")]
    Signing {
        actor: String,
        #[source]
        source: StoreError,
    },

    /// A signed receipt could not be written. Nothing was issued.
    #[error("failed to persist receipt {receipt_id}: {source}")]
    Persist {
        receipt_id: String,
        #[source]
        source: StoreError,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Peer exchange error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Encoding error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Initiator does not hold a console seat.
    #[error("unauthorized seat: {0}")]
    UnauthorizedSeat(String),

    /// Receipt not found.
    #[error("receipt not found: {0}")]
    ReceiptNotFound(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
