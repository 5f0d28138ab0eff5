//! Ledger configuration.
//!
//! Loaded from YAML. Every field has a default, so an empty document yields
//! a working single-node configuration rooted at `./data`.
//!
//! ```yaml
//! data_dir: /var/lib/dis
//! node_id: domain.terra
//! core_hash: DIS-CORE v1.0
//! console_id: ac-7f3e
//! seats: [uid-terracouncil-001, uid-terracouncil-002]
//! sweep_interval_secs: 1800
//! heartbeat_interval_secs: 1800
//! skip_buffer_secs: 5
//! network_file: /etc/dis/peers.yaml
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dis_ledger_store::is_safe_name;
use dis_ledger_sync::{NetworkConfig, SyncError};

/// Top-level ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Root of all durable state.
    pub data_dir: PathBuf,

    /// This node's actor name; signs audit and console receipts.
    pub node_id: String,

    /// Policy/schema fingerprint stamped on receipts issued by this node.
    pub core_hash: String,

    /// Console id recorded on receipts issued by this node.
    pub console_id: String,

    /// Seat holders allowed to initiate console actions. The first one signs
    /// verification reports.
    pub seats: Vec<String>,

    pub sweep_interval_secs: u64,

    pub heartbeat_interval_secs: u64,

    /// Grace period added to the last-verification time before new files
    /// count as changes.
    pub skip_buffer_secs: u64,

    /// Per-request timeout for heartbeat deliveries.
    pub peer_timeout_secs: u64,

    /// Peers declared inline.
    pub network: NetworkConfig,

    /// Optional separate peers file, merged after the inline peers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_file: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            node_id: "domain.terra".into(),
            core_hash: "DIS-CORE v1.0".into(),
            console_id: "ac-local".into(),
            seats: vec![
                "uid-terracouncil-001".into(),
                "uid-terracouncil-002".into(),
            ],
            sweep_interval_secs: 30 * 60,
            heartbeat_interval_secs: 30 * 60,
            skip_buffer_secs: 5,
            peer_timeout_secs: 10,
            network: NetworkConfig::default(),
            network_file: None,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a YAML file, including any `network_file`.
    ///
    /// A relative `network_file` resolves against the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or parsed, or if the
    /// result fails [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.merge_network_file(path.parent())?;
        config.validate()?;
        Ok(config)
    }

    /// Append the peers of `network_file`, if set, to the inline peers.
    ///
    /// A relative path resolves against `base` when given.
    pub fn merge_network_file(&mut self, base: Option<&Path>) -> Result<(), ConfigError> {
        let Some(file) = self.network_file.clone() else {
            return Ok(());
        };
        let file = match base {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file,
        };
        let extra = NetworkConfig::from_file(&file)?;
        self.network.peers.extend(extra.peers);
        Ok(())
    }

    /// Parse configuration from a YAML string. `network_file` is not followed.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_safe_name(&self.node_id) {
            return Err(ConfigError::Validation(format!(
                "node_id {:?} must be a plain file name",
                self.node_id
            )));
        }
        if self.seats.is_empty() {
            return Err(ConfigError::Validation(
                "at least one seat holder is required".into(),
            ));
        }
        if self.sweep_interval_secs == 0 || self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Validation("intervals must be non-zero".into()));
        }
        if self.network.find(&self.node_id).is_some() {
            return Err(ConfigError::Validation(format!(
                "node {} lists itself as a peer",
                self.node_id
            )));
        }
        self.network.validate()?;
        Ok(())
    }

    /// Seat that signs verification reports.
    pub fn audit_seat(&self) -> &str {
        self.seats.first().map(String::as_str).unwrap_or_default()
    }

    /// True if `seat` may initiate console actions.
    pub fn holds_seat(&self, seat: &str) -> bool {
        self.seats.iter().any(|s| s == seat)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    /// Path of the trust ledger document.
    pub fn trust_file(&self) -> PathBuf {
        self.data_dir.join(dis_ledger_sync::trust::TRUST_FILE)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Peer network file error.
    #[error("peer network: {0}")]
    Network(#[from] SyncError),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
