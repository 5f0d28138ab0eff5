//! Receipt issuance: sign and persist one receipt.

use std::sync::Arc;

use dis_ledger_core::{Provenance, Receipt, ReceiptBuilder, ReceiptId};
use dis_ledger_store::{KeyStore, ReceiptStore};

use crate::error::{LedgerError, Result};

/// Everything needed to issue one receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueRequest {
    pub actor: String,
    pub action: String,
    pub frozen_core_hash: String,
    pub console_id: String,
    pub issuer_seat: String,
    pub provenance: Vec<Provenance>,
    /// Earlier receipt this one replaces.
    pub supersedes: Option<ReceiptId>,
}

impl IssueRequest {
    pub fn new(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn core(mut self, frozen_core_hash: impl Into<String>) -> Self {
        self.frozen_core_hash = frozen_core_hash.into();
        self
    }

    pub fn console(mut self, console_id: impl Into<String>) -> Self {
        self.console_id = console_id.into();
        self
    }

    pub fn seat(mut self, seat: impl Into<String>) -> Self {
        self.issuer_seat = seat.into();
        self
    }

    pub fn provenance(mut self, p: Provenance) -> Self {
        self.provenance.push(p);
        self
    }

    pub fn supersedes(mut self, original: ReceiptId) -> Self {
        self.supersedes = Some(original);
        self
    }
}

/// Signs receipts with per-actor keys and persists them.
pub struct Issuer<S: ReceiptStore, K: KeyStore> {
    store: Arc<S>,
    keys: Arc<K>,
}

impl<S: ReceiptStore, K: KeyStore> Clone for Issuer<S, K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            keys: self.keys.clone(),
        }
    }
}

impl<S: ReceiptStore, K: KeyStore> Issuer<S, K> {
    pub fn new(store: Arc<S>, keys: Arc<K>) -> Self {
        Self { store, keys }
    }

    /// Issue a receipt.
    ///
    /// The actor's keypair is created on first use. The returned receipt is
    /// already durable in both the individual file and the append log.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Signing`] if the actor's key cannot be loaded or created
    /// - [`LedgerError::Persist`] if either write fails
    pub async fn issue(&self, request: IssueRequest) -> Result<Receipt> {
        let IssueRequest {
            actor,
            action,
            frozen_core_hash,
            console_id,
            issuer_seat,
            provenance,
            supersedes,
        } = request;

        let keypair = self
            .keys
            .ensure_keys(&actor)
            .await
            .map_err(|source| LedgerError::Signing {
                actor: actor.clone(),
                source,
            })?;

        let mut builder = ReceiptBuilder::new(actor, action)
            .frozen_core_hash(frozen_core_hash)
            .console(console_id)
            .seat(issuer_seat);
        for p in provenance {
            builder = builder.provenance(p);
        }
        if let Some(original) = &supersedes {
            builder = builder.supersedes(original);
        }
        let receipt = builder.sign(&keypair);

        self.store
            .persist(&receipt)
            .await
            .map_err(|source| LedgerError::Persist {
                receipt_id: receipt.receipt_id.to_string(),
                source,
            })?;

        tracing::info!(
            receipt_id = %receipt.receipt_id,
            actor = %receipt.actor,
            action = %receipt.action,
            "receipt issued"
        );
        Ok(receipt)
    }
}
