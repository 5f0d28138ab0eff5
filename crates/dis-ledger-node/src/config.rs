//! Node configuration: the ledger settings plus the listen address.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dis_ledger::{ConfigError, LedgerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,

    #[serde(flatten)]
    pub ledger: LedgerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            ledger: LedgerConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a YAML file. Ledger keys sit at the top level next to
    /// `bind_addr`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.ledger.merge_network_file(path.parent())?;
        config.ledger.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.ledger.validate()?;
        Ok(config)
    }
}
