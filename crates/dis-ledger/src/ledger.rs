//! The Ledger: unified service root for one governance node.
//!
//! Owns the stores, the issuer, the sweep and the trust ledger, and is
//! injected into callers (HTTP handlers, the scheduler, CLI tools).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use dis_ledger_core::{
    freeze_fingerprint, parse_timestamp, Provenance, Receipt, ReceiptId, FREEZE_ACTION,
    VERIFY_ACTION,
};
use dis_ledger_store::{Area, FsKeyStore, FsStore, KeyStore, ReceiptStore};
use dis_ledger_sync::{
    InboundEndpoint, InboundOutcome, NetworkConfig, PeerReply, PeerVerifier, TrustEntry,
    TrustLedger,
};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::issuer::{IssueRequest, Issuer};
use crate::sweep::{SweepOutput, Sweeper};

/// A governance node's receipt ledger.
///
/// Provides:
/// - Receipt issuance (console actions, freezes, corrections)
/// - On-demand verification sweeps
/// - Inbound peer receipt acceptance
/// - Read access to receipts and the trust ledger
pub struct Ledger<S: ReceiptStore, K: KeyStore> {
    config: Arc<LedgerConfig>,
    store: Arc<S>,
    issuer: Issuer<S, K>,
    sweeper: Sweeper<S, K>,
    trust: Arc<TrustLedger>,
    network: Arc<NetworkConfig>,
    verifier: PeerVerifier<S>,
    /// Serialises sweeps so on-demand and scheduled passes do not interleave.
    sweep_lock: Mutex<()>,
}

impl Ledger<FsStore, FsKeyStore> {
    /// Open the filesystem-backed ledger rooted at `config.data_dir`.
    pub async fn open(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(FsStore::open(&config.data_dir).await?);
        let keys = Arc::new(FsKeyStore::new(&config.data_dir));
        let trust = Arc::new(TrustLedger::load(config.trust_file()).await?);

        tracing::info!(
            data_dir = %config.data_dir.display(),
            node_id = %config.node_id,
            peers = config.network.peers.len(),
            "ledger opened"
        );
        Ok(Self::new(config, store, keys, trust))
    }
}

impl<S: ReceiptStore, K: KeyStore> Ledger<S, K> {
    /// Assemble a ledger from already-open parts.
    pub fn new(config: LedgerConfig, store: Arc<S>, keys: Arc<K>, trust: Arc<TrustLedger>) -> Self {
        let config = Arc::new(config);
        let network = Arc::new(config.network.clone());
        let issuer = Issuer::new(store.clone(), keys);
        Self {
            sweeper: Sweeper::new(store.clone(), issuer.clone(), config.clone()),
            verifier: PeerVerifier::new(network.clone(), store.clone(), trust.clone()),
            issuer,
            config,
            store,
            trust,
            network,
            sweep_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn trust(&self) -> &Arc<TrustLedger> {
        &self.trust
    }

    pub fn network(&self) -> &Arc<NetworkConfig> {
        &self.network
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issuance
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue an arbitrary receipt.
    pub async fn issue(&self, request: IssueRequest) -> Result<Receipt> {
        self.issuer.issue(request).await
    }

    /// Record a console action initiated by a seat holder.
    pub async fn record_action(
        &self,
        action: &str,
        initiator: &str,
        provenance: Vec<Provenance>,
    ) -> Result<Receipt> {
        let mut request = self.node_request(action, initiator)?;
        request.provenance = provenance;
        self.issuer.issue(request).await
    }

    /// Freeze a registry: bind the sorted item hashes into one fingerprint.
    pub async fn freeze<I, T>(&self, initiator: &str, item_hashes: I) -> Result<Receipt>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let request = self
            .node_request(FREEZE_ACTION, initiator)?
            .core(freeze_fingerprint(item_hashes));
        self.issuer.issue(request).await
    }

    /// Issue a correction superseding `original`.
    ///
    /// The original stays untouched; the correction points at it.
    pub async fn record_correction(
        &self,
        original: &ReceiptId,
        action: &str,
        initiator: &str,
    ) -> Result<Receipt> {
        let request = self
            .node_request(action, initiator)?
            .supersedes(original.clone());
        if self.store.get(original).await?.is_none() {
            return Err(LedgerError::ReceiptNotFound(original.to_string()));
        }
        self.issuer.issue(request).await
    }

    fn node_request(&self, action: &str, initiator: &str) -> Result<IssueRequest> {
        if !self.config.holds_seat(initiator) {
            tracing::warn!(%initiator, %action, "action from unauthorized seat");
            return Err(LedgerError::UnauthorizedSeat(initiator.to_owned()));
        }
        Ok(IssueRequest::new(&self.config.node_id, action)
            .core(&self.config.core_hash)
            .console(&self.config.console_id)
            .seat(initiator))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query
    // ─────────────────────────────────────────────────────────────────────────

    /// Ids of the receipts in `generated/`, sorted.
    pub async fn list(&self) -> Result<Vec<ReceiptId>> {
        Ok(self
            .store
            .list(Area::Generated)
            .await?
            .into_iter()
            .filter_map(|name| name.strip_suffix(".json").map(ReceiptId::new))
            .collect())
    }

    pub async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>> {
        Ok(self.store.get(id).await?)
    }

    pub async fn trust_entries(&self) -> Vec<TrustEntry> {
        self.trust.entries().await
    }

    /// The most recent verification meta-receipt issued by this node.
    pub async fn latest_report_receipt(&self) -> Result<Option<Receipt>> {
        let mut latest: Option<(DateTime<Utc>, Receipt)> = None;
        for name in self.store.list(Area::Generated).await? {
            let Ok(bytes) = self.store.read(Area::Generated, &name).await else {
                continue;
            };
            let Ok(receipt) = Receipt::from_json(&bytes) else {
                continue;
            };
            if receipt.action != VERIFY_ACTION || receipt.actor != self.config.node_id {
                continue;
            }
            let Ok(at) = parse_timestamp(&receipt.created_at) else {
                continue;
            };
            if latest.as_ref().map_or(true, |(best, _)| at > *best) {
                latest = Some((at, receipt));
            }
        }
        Ok(latest.map(|(_, receipt)| receipt))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a full verification sweep now.
    pub async fn verify_all(&self) -> Result<SweepOutput> {
        let _guard = self.sweep_lock.lock().await;
        self.sweeper.run().await
    }

    /// Check a receipt pushed by a peer against its configured key.
    pub async fn accept_peer_receipt(&self, receipt: Receipt) -> Result<InboundOutcome> {
        Ok(self.verifier.accept(receipt).await?)
    }
}

#[async_trait]
impl<S, K> InboundEndpoint for Ledger<S, K>
where
    S: ReceiptStore + 'static,
    K: KeyStore + 'static,
{
    async fn receive(&self, receipt: Receipt) -> dis_ledger_sync::Result<PeerReply> {
        self.verifier.receive(receipt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dis_ledger_core::verify_embedded;
    use dis_ledger_store::{MemoryKeyStore, MemoryStore};

    async fn ledger() -> (Ledger<MemoryStore, MemoryKeyStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let trust = Arc::new(TrustLedger::load(dir.path().join("trust.json")).await.unwrap());
        let ledger = Ledger::new(
            LedgerConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryKeyStore::new()),
            trust,
        );
        (ledger, dir)
    }

    #[tokio::test]
    async fn test_record_action_checks_seat() {
        let (ledger, _dir) = ledger().await;

        let receipt = ledger
            .record_action("console.approve.v1", "uid-terracouncil-002", Vec::new())
            .await
            .unwrap();
        assert_eq!(receipt.actor, "domain.terra");
        assert_eq!(receipt.metadata.issuer_seat, "uid-terracouncil-002");
        assert_eq!(receipt.metadata.issued_from_console, "ac-local");

        let err = ledger
            .record_action("console.approve.v1", "uid-intruder", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnauthorizedSeat(ref s) if s == "uid-intruder"));
        assert_eq!(ledger.list().await.unwrap(), vec![receipt.receipt_id]);
    }

    #[tokio::test]
    async fn test_freeze_binds_fingerprint() {
        let (ledger, _dir) = ledger().await;
        let receipt = ledger
            .freeze("uid-terracouncil-001", ["bb", "aa"])
            .await
            .unwrap();
        assert_eq!(receipt.action, FREEZE_ACTION);
        assert_eq!(receipt.frozen_core_hash, freeze_fingerprint(["aa", "bb"]));
        assert_eq!(verify_embedded(&receipt), Ok(()));
    }

    #[tokio::test]
    async fn test_correction_requires_original() {
        let (ledger, _dir) = ledger().await;
        let err = ledger
            .record_correction(&ReceiptId::new("r-missing"), "fix.v1", "uid-terracouncil-001")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReceiptNotFound(_)));

        let original = ledger
            .record_action("console.approve.v1", "uid-terracouncil-001", Vec::new())
            .await
            .unwrap();
        let fix = ledger
            .record_correction(&original.receipt_id, "console.approve.v1", "uid-terracouncil-001")
            .await
            .unwrap();
        assert_eq!(
            fix.superseded_ids().collect::<Vec<_>>(),
            vec![original.receipt_id.as_str()]
        );
        // The original is untouched.
        assert_eq!(ledger.get(&original.receipt_id).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_latest_report_receipt_tracks_sweeps() {
        let (ledger, _dir) = ledger().await;
        assert!(ledger.latest_report_receipt().await.unwrap().is_none());

        let first = ledger.verify_all().await.unwrap();
        let second = ledger.verify_all().await.unwrap();
        let latest = ledger.latest_report_receipt().await.unwrap().unwrap();
        assert_ne!(first.receipt.receipt_id, second.receipt.receipt_id);
        assert_eq!(latest.receipt_id, second.receipt.receipt_id);
    }
}
