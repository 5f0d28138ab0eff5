//! Heartbeat: push a receipt to every trusted peer.
//!
//! Every delivery attempt, successful or not, lands in the trust ledger as a
//! `sent` entry. Failures never propagate: an unreachable peer is logged and
//! simply tried again on the next interval.

use std::sync::Arc;

use dis_ledger_core::Receipt;

use crate::error::SyncError;
use crate::peers::NetworkConfig;
use crate::transport::{PeerTransport, ReplyStatus};
use crate::trust::{TrustAction, TrustEntry, TrustLedger, TrustStatus};

/// Counters for one heartbeat round.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Trusted peers attempted.
    pub attempted: usize,
    pub ok: usize,
    pub invalid: usize,
    pub unreachable: usize,
    /// Trust ledger writes that failed.
    pub unrecorded: usize,
}

/// Publishes receipts to trusted peers.
pub struct Heartbeat<T: PeerTransport> {
    transport: Arc<T>,
    network: Arc<NetworkConfig>,
    trust: Arc<TrustLedger>,
}

impl<T: PeerTransport> Heartbeat<T> {
    pub fn new(transport: Arc<T>, network: Arc<NetworkConfig>, trust: Arc<TrustLedger>) -> Self {
        Self {
            transport,
            network,
            trust,
        }
    }

    /// Deliver `receipt` to each trusted peer in configuration order.
    pub async fn publish(&self, receipt: &Receipt) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();

        for peer in self.network.trusted() {
            report.attempted += 1;

            let (status, notes) = match self.transport.deliver(peer, receipt).await {
                Ok(reply) if reply.status == ReplyStatus::Valid => (TrustStatus::Ok, None),
                Ok(reply) => (
                    TrustStatus::Invalid,
                    Some(reply.reason.unwrap_or_else(|| "rejected by peer".into())),
                ),
                Err(SyncError::PeerRejected { reason, .. }) => (TrustStatus::Invalid, Some(reason)),
                Err(e) => (TrustStatus::Unreachable, Some(e.to_string())),
            };

            match status {
                TrustStatus::Ok => {
                    report.ok += 1;
                    tracing::info!(peer = %peer.name, receipt_id = %receipt.receipt_id, "heartbeat delivered");
                }
                TrustStatus::Invalid => {
                    report.invalid += 1;
                    tracing::warn!(peer = %peer.name, reason = ?notes, "heartbeat rejected");
                }
                TrustStatus::Unreachable => {
                    report.unreachable += 1;
                    tracing::warn!(peer = %peer.name, reason = ?notes, "peer unreachable");
                }
            }

            let mut entry = TrustEntry::new(&peer.name, TrustAction::Sent, status, receipt);
            if let Some(notes) = notes {
                entry = entry.with_notes(notes);
            }
            if let Err(e) = self.trust.add(entry).await {
                report.unrecorded += 1;
                tracing::error!(peer = %peer.name, error = %e, "failed to record trust entry");
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::PeerVerifier;
    use crate::peers::{PeerConfig, TrustLevel};
    use crate::transport::memory::MemoryTransport;
    use dis_ledger_core::{Keypair, ReceiptBuilder};
    use dis_ledger_store::MemoryStore;

    fn peer(name: &str, key: &Keypair, level: TrustLevel) -> PeerConfig {
        PeerConfig {
            name: name.into(),
            url: format!("mem://{name}"),
            public_key_b64: key.public_key().to_base64(),
            trust_level: level,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_publish_records_each_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let terra = Keypair::generate();

        // Receiving node "domain.aqua" knows terra's real key.
        let aqua_trust = Arc::new(TrustLedger::load(dir.path().join("aqua.json")).await.unwrap());
        let aqua = Arc::new(PeerVerifier::new(
            Arc::new(NetworkConfig {
                peers: vec![peer("domain.terra", &terra, TrustLevel::Observer)],
            }),
            Arc::new(MemoryStore::new()),
            aqua_trust.clone(),
        ));
        // Receiving node "domain.ignis" has a stale key for terra.
        let ignis = Arc::new(PeerVerifier::new(
            Arc::new(NetworkConfig {
                peers: vec![peer("domain.terra", &Keypair::generate(), TrustLevel::Observer)],
            }),
            Arc::new(MemoryStore::new()),
            Arc::new(TrustLedger::load(dir.path().join("ignis.json")).await.unwrap()),
        ));

        let transport = Arc::new(MemoryTransport::new());
        transport.register("mem://domain.aqua", aqua).await;
        transport.register("mem://domain.ignis", ignis).await;

        let any = Keypair::generate();
        let network = Arc::new(NetworkConfig {
            peers: vec![
                peer("domain.aqua", &any, TrustLevel::Trusted),
                peer("domain.ignis", &any, TrustLevel::Trusted),
                peer("domain.ventus", &any, TrustLevel::Trusted),
                peer("domain.umbra", &any, TrustLevel::Observer),
            ],
        });
        let trust = Arc::new(TrustLedger::load(dir.path().join("terra.json")).await.unwrap());
        let heartbeat = Heartbeat::new(transport.clone(), network, trust.clone());

        let receipt = ReceiptBuilder::new("domain.terra", "domain.verify.v1").sign(&terra);
        let report = heartbeat.publish(&receipt).await;

        assert_eq!(
            report,
            HeartbeatReport {
                attempted: 3,
                ok: 1,
                invalid: 1,
                unreachable: 1,
                unrecorded: 0
            }
        );

        let statuses: Vec<(String, TrustStatus)> = trust
            .entries()
            .await
            .into_iter()
            .map(|e| (e.peer, e.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("domain.aqua".to_string(), TrustStatus::Ok),
                ("domain.ignis".to_string(), TrustStatus::Invalid),
                ("domain.ventus".to_string(), TrustStatus::Unreachable),
            ]
        );
        assert!(trust.entries().await.iter().all(|e| e.action == TrustAction::Sent));

        // Observer peers never receive heartbeats.
        assert!(transport
            .deliveries()
            .await
            .iter()
            .all(|(name, _)| name != "domain.umbra"));
        assert_eq!(aqua_trust.entries().await[0].status, TrustStatus::Ok);
    }

    #[tokio::test]
    async fn test_publish_without_trusted_peers() {
        let dir = tempfile::tempdir().unwrap();
        let trust = Arc::new(TrustLedger::load(dir.path().join("t.json")).await.unwrap());
        let heartbeat = Heartbeat::new(
            Arc::new(MemoryTransport::new()),
            Arc::new(NetworkConfig::default()),
            trust.clone(),
        );
        let receipt = ReceiptBuilder::new("domain.terra", "domain.verify.v1").sign(&Keypair::generate());
        assert_eq!(heartbeat.publish(&receipt).await, HeartbeatReport::default());
        assert!(trust.is_empty().await);
    }
}
