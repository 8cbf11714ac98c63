// ============================================================================
// PI-PAYMENTS - Configuration
// ============================================================================
// Network selection and endpoints for Pi mainnet and testnet.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Network identifier used by the Pi platform ("network" field of payments).
pub const MAINNET_ID: &str = "Pi Network";
/// Testnet identifier.
pub const TESTNET_ID: &str = "Pi Testnet";

/// Stroops per Pi (the ledger's smallest fee/amount unit).
pub const STROOPS_PER_PI: i64 = 10_000_000;

/// Base fee in stroops used until fee stats have been fetched.
pub const DEFAULT_BASE_FEE: u32 = 100;

/// Network selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Resolve a network from its platform identifier.
    ///
    /// Unrecognized identifiers fall back to testnet with a logged warning,
    /// so a bad value can never route funds to mainnet by accident.
    pub fn from_name(name: &str) -> Self {
        match name {
            MAINNET_ID => Network::Mainnet,
            TESTNET_ID => Network::Testnet,
            other => {
                warn!("Unrecognized network id {:?}, using Pi Testnet", other);
                Network::Testnet
            }
        }
    }

    /// Platform identifier for this network.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_ID,
            Network::Testnet => TESTNET_ID,
        }
    }

    /// Passphrase used when hashing transactions for signing.
    /// On Pi the network identifier doubles as the signing passphrase.
    pub fn passphrase(&self) -> &'static str {
        self.name()
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Testnet
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiConfig {
    /// Network (mainnet or testnet)
    pub network: Network,

    /// Horizon ledger server URL
    pub horizon_url: String,

    /// Pi platform REST API base URL
    pub api_base_url: String,

    /// Network passphrase for transaction signing
    pub network_passphrase: String,

    /// Base fee in stroops (1 Pi = 10,000,000 stroops)
    pub base_fee: u32,

    /// Submission timeout window of built transactions, in seconds
    pub tx_timeout_secs: u64,

    /// HTTP request timeout for platform and ledger calls, in seconds
    pub request_timeout_secs: u64,
}

impl PiConfig {
    /// Create mainnet configuration
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            horizon_url: "https://api.mainnet.minepi.com".to_string(),
            api_base_url: "https://api.minepi.com".to_string(),
            network_passphrase: MAINNET_ID.to_string(),
            base_fee: DEFAULT_BASE_FEE,
            tx_timeout_secs: 30,
            request_timeout_secs: 30,
        }
    }

    /// Create testnet configuration
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            horizon_url: "https://api.testnet.minepi.com".to_string(),
            api_base_url: "https://api.minepi.com".to_string(),
            network_passphrase: TESTNET_ID.to_string(),
            base_fee: DEFAULT_BASE_FEE,
            tx_timeout_secs: 30,
            request_timeout_secs: 30,
        }
    }

    /// Configuration for a given network
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Testnet => Self::testnet(),
        }
    }

    /// Check if this is mainnet
    pub fn is_mainnet(&self) -> bool {
        self.network == Network::Mainnet
    }
}

impl Default for PiConfig {
    fn default() -> Self {
        Self::testnet()
    }
}
