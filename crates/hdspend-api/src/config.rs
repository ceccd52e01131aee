//! Engine configuration, parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hdspend_core::chain::parse_network;
use hdspend_core::ChainParams;
use hdspend_discovery::{AccountDiscovery, AddressUsageSource, DEFAULT_BATCH_SIZE};
use hdspend_electrum::ElectrumClient;
use hdspend_signer::{ReplayProtectionSource, SigningOrchestrator};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Which chain and network to operate on
    #[serde(default)]
    pub chain: ChainSection,

    /// Wallet data API
    #[serde(default)]
    pub api: ApiSection,

    /// Account discovery settings
    #[serde(default)]
    pub discovery: DiscoverySection,

    /// Electrum usage source (alternative to the API)
    #[serde(default)]
    pub electrum: ElectrumSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSection {
    /// "btc" or "bch"
    #[serde(default = "default_chain")]
    pub name: String,

    /// "bitcoin", "testnet", "signet", "regtest"
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            name: default_chain(),
            network: default_network(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// Accounts probed per network round trip
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectrumSection {
    /// Server URL; unset means the per-chain default
    pub url: Option<String>,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_chain() -> String {
    "btc".to_string()
}

fn default_network() -> String {
    "bitcoin".to_string()
}

fn default_api_url() -> String {
    "https://api.blockchain.info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: EngineConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `HDSPEND_CHAIN`
    /// - `HDSPEND_NETWORK`
    /// - `HDSPEND_API_URL`
    /// - `HDSPEND_BATCH_SIZE`
    /// - `HDSPEND_ELECTRUM_URL`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HDSPEND_CHAIN") {
            self.chain.name = v;
        }
        if let Ok(v) = std::env::var("HDSPEND_NETWORK") {
            self.chain.network = v;
        }
        if let Ok(v) = std::env::var("HDSPEND_API_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = std::env::var("HDSPEND_BATCH_SIZE") {
            if let Ok(size) = v.parse::<u32>() {
                self.discovery.batch_size = size;
            }
        }
        if let Ok(v) = std::env::var("HDSPEND_ELECTRUM_URL") {
            self.electrum.url = Some(v);
        }
    }

    /// Parse the network string to a `bitcoin::Network`.
    pub fn network(&self) -> bitcoin::Network {
        parse_network(&self.chain.network)
    }

    /// Chain rules for the configured chain and network.
    pub fn chain_params(&self) -> Result<ChainParams> {
        ChainParams::from_name(&self.chain.name, self.network())
            .with_context(|| format!("Unknown chain: {}", self.chain.name))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.chain_params()?;

        anyhow::ensure!(
            self.discovery.batch_size > 0,
            "discovery.batch_size must be > 0"
        );

        anyhow::ensure!(
            self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"),
            "api.base_url must be an http(s) URL"
        );

        anyhow::ensure!(self.api.timeout_secs > 0, "api.timeout_secs must be > 0");

        if let Some(ref url) = self.electrum.url {
            anyhow::ensure!(!url.is_empty(), "electrum.url must not be empty");
        }

        Ok(())
    }

    // ========================================================================
    // Wiring
    // ========================================================================

    /// API client for the configured chain.
    pub fn api_client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.api.base_url, self.chain_params()?, self.timeout())
            .context("Failed to build HTTP client")
    }

    /// Usage source for discovery: Electrum when `electrum.url` is set, otherwise the API.
    ///
    /// Electrum answers for addresses only, not extended public keys.
    pub fn usage_source(&self) -> Result<Arc<dyn AddressUsageSource>> {
        match self.electrum.url {
            Some(ref url) => {
                log::info!("Using Electrum server {} for address usage", url);
                let client = ElectrumClient::new(url, self.chain_params()?).map_err(|e| {
                    anyhow::anyhow!("Failed to connect to Electrum server {}: {}", url, e)
                })?;
                Ok(Arc::new(client))
            }
            None => Ok(Arc::new(self.api_client()?)),
        }
    }

    /// Discovery engine backed by the configured usage source.
    pub fn account_discovery(&self) -> Result<AccountDiscovery> {
        Ok(AccountDiscovery::new(self.usage_source()?))
    }

    /// Signing entry point, with API-served replay protection where the chain needs it.
    pub fn signing_orchestrator(&self) -> Result<SigningOrchestrator> {
        let params = self.chain_params()?;
        let source: Arc<dyn ReplayProtectionSource> = Arc::new(self.api_client()?);
        Ok(SigningOrchestrator::for_chain(params, Some(source)))
    }
}

// ============================================================================
// Tests
// ============================================================================
