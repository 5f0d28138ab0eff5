//! Transport abstraction for peer receipt delivery.
//!
//! The wire contract is a raw receipt JSON document POSTed to the peer's
//! `/api/verify/external` endpoint, answered with a small verdict document.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dis_ledger_core::Receipt;

use crate::error::{Result, SyncError};
use crate::peers::PeerConfig;

/// Path of the inbound verification endpoint on every node.
pub const VERIFY_EXTERNAL_PATH: &str = "/api/verify/external";

/// Verdict of the receiving node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Valid,
    Invalid,
}

/// Reply body of the inbound verification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerReply {
    pub status: ReplyStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Where the receiver stored the accepted receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<String>,
}

impl PeerReply {
    pub fn valid(peer: impl Into<String>, saved: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Valid,
            peer: Some(peer.into()),
            reason: None,
            saved: Some(saved.into()),
        }
    }

    pub fn invalid(peer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Invalid,
            peer: Some(peer.into()),
            reason: Some(reason.into()),
            saved: None,
        }
    }
}

/// Delivers a receipt to one peer.
///
/// Implementations map failures onto two error kinds:
/// - [`SyncError::PeerUnreachable`] when no verdict could be obtained
/// - [`SyncError::PeerRejected`] when the peer refused the request outright
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn deliver(&self, peer: &PeerConfig, receipt: &Receipt) -> Result<PeerReply>;
}

/// The receiving side of a delivery.
#[async_trait]
pub trait InboundEndpoint: Send + Sync {
    async fn receive(&self, receipt: Receipt) -> Result<PeerReply>;
}

/// HTTP transport over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    fn endpoint(peer: &PeerConfig) -> String {
        format!("{}{VERIFY_EXTERNAL_PATH}", peer.url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn deliver(&self, peer: &PeerConfig, receipt: &Receipt) -> Result<PeerReply> {
        let unreachable = |reason: String| SyncError::PeerUnreachable {
            peer: peer.name.clone(),
            reason,
        };

        let resp = self
            .client
            .post(Self::endpoint(peer))
            .json(receipt)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() {
            let reason = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("reason")
                        .or_else(|| body.get("error"))
                        .and_then(|r| r.as_str())
                        .map(str::to_owned)
                })
                .unwrap_or_else(|| status.to_string());
            return Err(SyncError::PeerRejected {
                peer: peer.name.clone(),
                reason,
            });
        }
        if !status.is_success() {
            return Err(unreachable(format!("HTTP {status}")));
        }

        resp.json::<PeerReply>()
            .await
            .map_err(|e| unreachable(format!("malformed reply: {e}")))
    }
}

/// An in-memory transport for testing.
///
/// Routes deliveries by peer URL to registered endpoints; unregistered URLs
/// behave like unreachable hosts.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{Mutex, RwLock};

    use dis_ledger_core::ReceiptId;

    #[derive(Default)]
    pub struct MemoryTransport {
        endpoints: RwLock<HashMap<String, Arc<dyn InboundEndpoint>>>,
        delivered: Mutex<Vec<(String, ReceiptId)>>,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Route deliveries for `url` to `endpoint`.
        pub async fn register(&self, url: impl Into<String>, endpoint: Arc<dyn InboundEndpoint>) {
            self.endpoints.write().await.insert(url.into(), endpoint);
        }

        /// Take a URL offline.
        pub async fn unregister(&self, url: &str) {
            self.endpoints.write().await.remove(url);
        }

        /// Successful hand-offs so far: (peer name, receipt id).
        pub async fn deliveries(&self) -> Vec<(String, ReceiptId)> {
            self.delivered.lock().await.clone()
        }
    }

    #[async_trait]
    impl PeerTransport for MemoryTransport {
        async fn deliver(&self, peer: &PeerConfig, receipt: &Receipt) -> Result<PeerReply> {
            let endpoint = self
                .endpoints
                .read()
                .await
                .get(&peer.url)
                .cloned()
                .ok_or_else(|| SyncError::PeerUnreachable {
                    peer: peer.name.clone(),
                    reason: "connection refused".into(),
                })?;

            self.delivered
                .lock()
                .await
                .push((peer.name.clone(), receipt.receipt_id.clone()));

            match endpoint.receive(receipt.clone()).await {
                Ok(reply) => Ok(reply),
                Err(SyncError::UnknownPeer(name)) => Err(SyncError::PeerRejected {
                    peer: peer.name.clone(),
                    reason: format!("unknown peer {name}"),
                }),
                Err(SyncError::PeerRejected { reason, .. }) => Err(SyncError::PeerRejected {
                    peer: peer.name.clone(),
                    reason,
                }),
                Err(e) => Err(SyncError::PeerUnreachable {
                    peer: peer.name.clone(),
                    reason: e.to_string(),
                }),
            }
        }
    }
}
