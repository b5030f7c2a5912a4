//! Client configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use shiptrack_types::NetworkId;
use shiptrack_utils::LogFormat;

use crate::ClientError;

/// Configuration for a ledger client.
///
/// Can be loaded from a TOML file via [`ClientConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Which network profile to use.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Overrides the network profile's ledger contract address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,

    /// Overrides the network profile's RPC endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,

    /// Data directory for the local ledger.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Upper bound on a single session negotiation. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation_timeout_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Localhost
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./shiptrack_data")
}

fn default_map_size_mb() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ClientError> {
        toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ClientError> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Chain id of the selected network.
    pub fn chain_id(&self) -> u64 {
        self.network.chain_id()
    }

    /// RPC endpoint: the override if set, else the network default.
    pub fn effective_rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    /// Ledger contract address: the override if set, else the network default.
    pub fn effective_contract_address(&self) -> &str {
        self.contract_address
            .as_deref()
            .unwrap_or_else(|| self.network.default_contract_address())
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            contract_address: None,
            rpc_url: None,
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            negotiation_timeout_secs: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ClientConfig {
            negotiation_timeout_secs: Some(30),
            ..ClientConfig::default()
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = ClientConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.network, NetworkId::Localhost);
        assert_eq!(config.chain_id(), 31337);
        assert_eq!(config.effective_rpc_url(), "http://127.0.0.1:8545");
        assert_eq!(config.data_dir, PathBuf::from("./shiptrack_data"));
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.negotiation_timeout(), None);
    }

    #[test]
    fn network_profile_and_overrides() {
        let toml = r#"
            network = "polygon_amoy"
            rpc_url = "https://amoy.example.org"
            negotiation_timeout_secs = 15
            log_format = "json"
        "#;
        let config = ClientConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.chain_id(), 80002);
        assert_eq!(config.effective_rpc_url(), "https://amoy.example.org");
        assert_eq!(
            config.effective_contract_address(),
            NetworkId::PolygonAmoy.default_contract_address()
        );
        assert_eq!(config.negotiation_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn unknown_network_is_config_error() {
        let result = ClientConfig::from_toml_str(r#"network = "mainnet""#);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ClientConfig::from_toml_file(Path::new("/nonexistent/shiptrack.toml"));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shiptrack.toml");
        std::fs::write(&path, "map_size_mb = 8\n").unwrap();
        let config = ClientConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.map_size_bytes(), 8 * 1024 * 1024);
    }
}
