//! Inbound peer receipt verification.
//!
//! A peer receipt is accepted only if it verifies under the public key that
//! local configuration holds for the peer named in its `by` field. The key
//! embedded in the payload is never consulted.

use std::sync::Arc;

use async_trait::async_trait;

use dis_ledger_core::{now_timestamp, verify_with_key, Receipt};
use dis_ledger_store::{Area, ReceiptStore};

use crate::error::{Result, SyncError};
use crate::peers::{NetworkConfig, TrustLevel};
use crate::transport::{InboundEndpoint, PeerReply};
use crate::trust::{TrustAction, TrustEntry, TrustLedger, TrustStatus};

/// `verification_method` recorded on accepted peer receipts.
pub const PEER_KEY_METHOD: &str = "peer-config-key";

/// Result of checking one inbound receipt from a known peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Verified and stored under `peers/<saved>`.
    Accepted { peer: String, saved: String },
    /// Verification failed.
    Rejected { peer: String, reason: String },
}

impl From<InboundOutcome> for PeerReply {
    fn from(outcome: InboundOutcome) -> Self {
        match outcome {
            InboundOutcome::Accepted { peer, saved } => PeerReply::valid(peer, saved),
            InboundOutcome::Rejected { peer, reason } => PeerReply::invalid(peer, reason),
        }
    }
}

/// Verifies receipts pushed by peers.
pub struct PeerVerifier<S: ReceiptStore> {
    network: Arc<NetworkConfig>,
    store: Arc<S>,
    trust: Arc<TrustLedger>,
}

impl<S: ReceiptStore> PeerVerifier<S> {
    pub fn new(network: Arc<NetworkConfig>, store: Arc<S>, trust: Arc<TrustLedger>) -> Self {
        Self {
            network,
            store,
            trust,
        }
    }

    /// Check a receipt submitted by a peer.
    ///
    /// # Errors
    ///
    /// - [`SyncError::UnknownPeer`] if `by` names no configured peer
    /// - [`SyncError::PeerRejected`] if the peer is blocked
    /// - [`SyncError::InvalidPeerKey`] if the configured key is unusable
    ///
    /// A signature or hash failure is not an error: it is recorded in the
    /// trust ledger and returned as [`InboundOutcome::Rejected`].
    pub async fn accept(&self, mut receipt: Receipt) -> Result<InboundOutcome> {
        let name = receipt.actor.clone();
        let Some(peer) = self.network.find(&name) else {
            tracing::warn!(peer = %name, receipt_id = %receipt.receipt_id, "receipt from unknown peer");
            return Err(SyncError::UnknownPeer(name));
        };
        if peer.trust_level == TrustLevel::Blocked {
            tracing::warn!(peer = %name, "receipt from blocked peer");
            return Err(SyncError::PeerRejected {
                peer: name,
                reason: "peer is blocked".into(),
            });
        }
        let key = peer.public_key()?;

        if let Err(e) = verify_with_key(&receipt, &key) {
            let reason = e.to_string();
            tracing::warn!(peer = %name, receipt_id = %receipt.receipt_id, %reason, "peer receipt rejected");
            self.trust
                .add(
                    TrustEntry::new(&name, TrustAction::Received, TrustStatus::Invalid, &receipt)
                        .with_notes(reason.clone()),
                )
                .await?;
            return Ok(InboundOutcome::Rejected { peer: name, reason });
        }

        receipt.metadata.verified_at = Some(now_timestamp());
        receipt.metadata.verification_method = Some(PEER_KEY_METHOD.to_owned());
        let saved = format!("{name}.json");
        self.store
            .write(Area::Peers, &saved, &receipt.to_json_pretty()?)
            .await?;

        self.trust
            .add(TrustEntry::new(
                &name,
                TrustAction::Received,
                TrustStatus::Ok,
                &receipt,
            ))
            .await?;

        tracing::info!(peer = %name, receipt_id = %receipt.receipt_id, "peer receipt accepted");
        Ok(InboundOutcome::Accepted { peer: name, saved })
    }
}

#[async_trait]
impl<S: ReceiptStore + 'static> InboundEndpoint for PeerVerifier<S> {
    async fn receive(&self, receipt: Receipt) -> Result<PeerReply> {
        self.accept(receipt).await.map(PeerReply::from)
    }
}
