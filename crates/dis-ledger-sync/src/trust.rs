//! Trust ledger: append-only record of peer receipt exchanges.
//!
//! Stored as one JSON document `{"entries": [...]}`, rewritten wholesale on
//! each append. Volume is low (one entry per peer per heartbeat), so a single
//! mutex guards both the in-memory sequence and the file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use dis_ledger_core::{now_timestamp, Receipt};

use crate::error::{Result, SyncError};

/// Default file name under the data directory.
pub const TRUST_FILE: &str = "trust.json";

/// Direction of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustAction {
    Sent,
    Received,
}

/// Outcome of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    Ok,
    Invalid,
    Unreachable,
}

/// One exchange outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEntry {
    pub peer: String,
    pub action: TrustAction,
    pub status: TrustStatus,
    pub receipt_id: String,
    pub core_hash: String,
    pub verified_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TrustEntry {
    /// Entry for an exchange of `receipt` with `peer`, stamped now.
    pub fn new(
        peer: impl Into<String>,
        action: TrustAction,
        status: TrustStatus,
        receipt: &Receipt,
    ) -> Self {
        Self {
            peer: peer.into(),
            action,
            status,
            receipt_id: receipt.receipt_id.to_string(),
            core_hash: receipt.frozen_core_hash.clone(),
            verified_at: now_timestamp(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Serialize, Deserialize, Default)]
struct TrustDocument {
    #[serde(default)]
    entries: Vec<TrustEntry>,
}

/// The durable trust ledger.
pub struct TrustLedger {
    path: PathBuf,
    entries: Mutex<Vec<TrustEntry>>,
}

impl TrustLedger {
    /// Load the ledger, starting empty if the file does not exist.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice::<TrustDocument>(&bytes)
                    .map_err(|e| SyncError::Format(format!("{}: {e}", path.display())))?
                    .entries
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(SyncError::Ledger { path, source }),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the ledger document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry and rewrite the document.
    ///
    /// If the write fails the entry is dropped from memory too, so memory
    /// never runs ahead of disk.
    pub async fn add(&self, entry: TrustEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.push(entry);

        let doc = TrustDocument {
            entries: entries.clone(),
        };
        if let Err(e) = self.rewrite(&doc).await {
            entries.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn rewrite(&self, doc: &TrustDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(|e| SyncError::Format(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        let ledger_err = |source| SyncError::Ledger {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(ledger_err)?;
        }
        fs::write(&tmp, bytes).await.map_err(ledger_err)?;
        fs::rename(&tmp, &self.path).await.map_err(ledger_err)
    }

    /// Snapshot of all entries, in append order.
    pub async fn entries(&self) -> Vec<TrustEntry> {
        self.entries.lock().await.clone()
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
