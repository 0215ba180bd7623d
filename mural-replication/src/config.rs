use crate::registry::PeerRegistry;
use mural::MuralError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CLIENT_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_PEER_ADDR: &str = "127.0.0.1:9000";
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 2000;
pub const DEFAULT_PEER_TIMEOUT_MS: u64 = 5000;

/// Static node configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_client_addr")]
    pub client_addr: String,
    /// This node's own peer-facing address, as it appears in `peers`.
    #[serde(default = "default_peer_addr")]
    pub peer_addr: String,
    /// Every node of the cluster, this one included or not.
    #[serde(default)]
    pub peers: Vec<String>, // e.g., "127.0.0.1:9001" or "node-b:9000"
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,
}

fn default_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn default_client_addr() -> String {
    DEFAULT_CLIENT_ADDR.to_string()
}

fn default_peer_addr() -> String {
    DEFAULT_PEER_ADDR.to_string()
}

fn default_startup_delay_ms() -> u64 {
    DEFAULT_STARTUP_DELAY_MS
}

fn default_peer_timeout_ms() -> u64 {
    DEFAULT_PEER_TIMEOUT_MS
}

impl NodeConfig {
    /// Configuration for a node listening for peers on `peer_addr`, everything
    /// else defaulted.
    pub fn new(peer_addr: impl Into<String>, peers: Vec<String>) -> Self {
        NodeConfig {
            node_id: default_node_id(),
            client_addr: default_client_addr(),
            peer_addr: peer_addr.into(),
            peers,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            peer_timeout_ms: DEFAULT_PEER_TIMEOUT_MS,
        }
    }

    /// Read a node.json file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> mural::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load node configuration from {data_dir}/node.json, or from `MURAL_*`
    /// environment variables when the file is missing or unreadable.
    pub fn load_or_default(data_dir: &Path) -> Self {
        let node_json = data_dir.join("node.json");

        if node_json.exists() {
            match Self::from_file(&node_json) {
                Ok(config) => {
                    tracing::info!(
                        "Loaded node config: node_id={}, peer_addr={}, peers={}",
                        config.node_id,
                        config.peer_addr,
                        config.peers.len()
                    );
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to load node.json: {}, using environment", e);
                }
            }
        }

        let config = Self::from_env();
        tracing::info!(
            "No usable node.json, configured from environment: node_id={}, peers={}",
            config.node_id,
            config.peers.len()
        );
        config
    }

    /// Reject settings that would leave the node unable to replicate.
    ///
    /// A zero peer timeout expires every connect, read and write immediately.
    pub fn validate(&self) -> mural::Result<()> {
        if self.peer_timeout_ms == 0 {
            return Err(MuralError::Config(
                "peer_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.peer_addr.trim().is_empty() {
            return Err(MuralError::Config("peer_addr must not be empty".to_string()));
        }
        if self.client_addr.trim().is_empty() {
            return Err(MuralError::Config("client_addr must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: u64| {
            non_empty(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        NodeConfig {
            node_id: non_empty("MURAL_NODE_ID").unwrap_or_else(default_node_id),
            client_addr: non_empty("MURAL_CLIENT_ADDR").unwrap_or_else(default_client_addr),
            peer_addr: non_empty("MURAL_PEER_ADDR").unwrap_or_else(default_peer_addr),
            peers: non_empty("MURAL_PEERS")
                .map(|v| parse_peer_list(&v))
                .unwrap_or_default(),
            startup_delay_ms: millis("MURAL_STARTUP_DELAY_MS", DEFAULT_STARTUP_DELAY_MS),
            peer_timeout_ms: millis("MURAL_PEER_TIMEOUT_MS", DEFAULT_PEER_TIMEOUT_MS),
        }
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn registry(&self) -> PeerRegistry {
        PeerRegistry::new(self.peer_addr.clone(), self.peers.clone())
    }
}

/// Split a comma separated peer list, dropping blanks.
pub fn parse_peer_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
