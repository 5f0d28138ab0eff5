//! Peer network configuration.
//!
//! ```yaml
//! peers:
//!   - name: domain.aqua
//!     url: http://10.0.0.7:8080
//!     public_key_b64: "q1w2...="
//!     trust_level: trusted
//!     notes: regional council
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dis_ledger_core::PublicKey;

use crate::error::{Result, SyncError};

/// How far a peer is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Receives heartbeats; inbound receipts accepted.
    Trusted,
    /// No heartbeats; inbound receipts accepted.
    #[default]
    Observer,
    /// No heartbeats; inbound receipts refused.
    Blocked,
}

/// One configured peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// The peer's node id, matched against the `by` field of its receipts.
    pub name: String,

    /// Base URL of the peer's HTTP boundary.
    pub url: String,

    /// Base64 Ed25519 public key curated locally for this peer.
    pub public_key_b64: String,

    #[serde(default)]
    pub trust_level: TrustLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PeerConfig {
    /// Decode the configured key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_base64(&self.public_key_b64).map_err(|e| SyncError::InvalidPeerKey {
            peer: self.name.clone(),
            reason: e.to_string(),
        })
    }

    pub fn is_trusted(&self) -> bool {
        self.trust_level == TrustLevel::Trusted
    }
}

/// The set of known peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

impl NetworkConfig {
    /// Load from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if two peers
    /// share a name.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    /// Parse from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate names and empty names or URLs.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for peer in &self.peers {
            if peer.name.trim().is_empty() {
                return Err(SyncError::Config("peer with empty name".into()));
            }
            if peer.url.trim().is_empty() {
                return Err(SyncError::Config(format!("peer {} has no url", peer.name)));
            }
            if !seen.insert(peer.name.as_str()) {
                return Err(SyncError::Config(format!("duplicate peer {}", peer.name)));
            }
        }
        Ok(())
    }

    /// Look up a peer by its declared name.
    pub fn find(&self, name: &str) -> Option<&PeerConfig> {
        self.peers.iter().find(|p| p.name == name)
    }

    /// Peers that receive heartbeats.
    pub fn trusted(&self) -> impl Iterator<Item = &PeerConfig> {
        self.peers.iter().filter(|p| p.is_trusted())
    }
}
