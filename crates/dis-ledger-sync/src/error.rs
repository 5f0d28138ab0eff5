//! Error types for the sync module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during peer exchange.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Peer could not be reached or did not answer sensibly.
    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// Inbound receipt names a peer that is not in local configuration.
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// Peer refused the exchange, or is blocked locally.
    #[error("peer {peer} rejected: {reason}")]
    PeerRejected { peer: String, reason: String },

    /// Configured peer key does not decode to an Ed25519 public key.
    #[error("invalid public key configured for peer {peer}: {reason}")]
    InvalidPeerKey { peer: String, reason: String },

    /// Trust ledger file could not be read or written.
    #[error("trust ledger I/O error at {path}: {source}")]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Trust ledger or network configuration has invalid contents.
    #[error("invalid document: {0}")]
    Format(String),

    /// Network configuration error.
    #[error("network config error: {0}")]
    Config(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] dis_ledger_store::StoreError),

    /// Encoding failed.
    #[error("core error: {0}")]
    Core(#[from] dis_ledger_core::CoreError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
