//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Identifies which ledger network the client is pointed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkId {
    /// Local development node.
    Localhost,
    /// The Polygon Amoy public test network.
    PolygonAmoy,
}

impl NetworkId {
    /// Chain id the ledger engine is expected to run on.
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Localhost => 31337,
            Self::PolygonAmoy => 80002,
        }
    }

    /// Default JSON-RPC endpoint for this network.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Localhost => "http://127.0.0.1:8545",
            Self::PolygonAmoy => "https://rpc-amoy.polygon.technology/",
        }
    }

    /// Default ledger contract address for this network.
    pub fn default_contract_address(&self) -> &'static str {
        match self {
            Self::Localhost => "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            Self::PolygonAmoy => "0x0000000000000000000000000000000000000000",
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Localhost => "localhost",
            Self::PolygonAmoy => "polygon_amoy",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "localhost" | "local" => Ok(Self::Localhost),
            "polygon_amoy" | "amoy" => Ok(Self::PolygonAmoy),
            other => Err(TypesError::UnknownNetwork(other.to_string())),
        }
    }
}
