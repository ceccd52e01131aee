//! hdspend Electrum Usage Source
//!
//! Answers address usage lookups for account discovery from an Electrum
//! server. Each batch is two round trips: one batched history request and
//! one batched balance request.
//!
//! Electrum only reports history and current balance, so lifetime
//! received/sent totals are left empty. Lookups are per script, so only
//! address identifiers are served (`AccountDiscovery::discover_addresses`);
//! extended public keys are rejected.
//!
//! # Example
//!
//! ```ignore
//! use hdspend_electrum::{default_server, ElectrumClient};
//!
//! let params = ChainParams::bitcoin_cash(Network::Bitcoin);
//! let client = ElectrumClient::new(default_server(&params), params)?;
//! let discovery = AccountDiscovery::new(Arc::new(client));
//! ```

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::bip32::Xpub;
use bitcoin::{Amount, Network, Script, ScriptBuf};
use electrum_client::{ElectrumApi, Error as ElectrumError};
use hdspend_core::{decode_address, AddressError, Chain, ChainParams, DerivedAddress, NetworkError};
use hdspend_discovery::AddressUsageSource;
use thiserror::Error;

/// Errors from Electrum operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Electrum protocol error: {0}")]
    Protocol(#[from] ElectrumError),

    #[error("Invalid address {address}: {source}")]
    InvalidAddress {
        address: String,
        source: AddressError,
    },

    #[error("Electrum looks up addresses, not extended public keys: {0}")]
    ExtendedKey(String),

    #[error("Server answered {got} entries for {expected} scripts")]
    ResponseLength { expected: usize, got: usize },
}

impl From<Error> for NetworkError {
    fn from(e: Error) -> Self {
        match e {
            Error::Connection(_) | Error::Protocol(_) => NetworkError::Transport(e.to_string()),
            Error::InvalidAddress { .. }
            | Error::ExtendedKey(_)
            | Error::ResponseLength { .. } => {
                NetworkError::Decode(e.to_string())
            }
        }
    }
}

/// Electrum-backed address usage lookups for one chain
///
/// Serves address identifiers only; account-level xpubs fail with
/// [`Error::ExtendedKey`].
#[derive(Clone)]
pub struct ElectrumClient {
    client: Arc<electrum_client::Client>,
    params: ChainParams,
}

impl ElectrumClient {
    /// Connect to `url` (e.g. "ssl://electrum.blockstream.info:60002").
    ///
    /// Always use SSL URLs in production. Plaintext connections can be MITM'd.
    pub fn new(url: &str, params: ChainParams) -> Result<Self, Error> {
        if !url.starts_with("ssl://") && !url.contains("tls") {
            log::warn!("Connecting to Electrum without SSL - insecure for mainnet!");
        }

        let client = electrum_client::Client::new(url)
            .map_err(|e: ElectrumError| Error::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            params,
        })
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Usage for each address, in request order (blocking)
    pub fn get_usage(&self, addresses: &[String]) -> Result<Vec<DerivedAddress>, Error> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let scripts = address_scripts(&self.params, addresses)?;
        let refs: Vec<&Script> = scripts.iter().map(|s| s.as_script()).collect();

        let histories = self.client.batch_script_get_history(&refs)?;
        check_length(addresses.len(), histories.len())?;
        let balances = self.client.batch_script_get_balance(&refs)?;
        check_length(addresses.len(), balances.len())?;

        Ok(addresses
            .iter()
            .zip(histories.iter().zip(&balances))
            .map(|(address, (history, balance))| DerivedAddress {
                transaction_count: history.len() as u64,
                final_balance: net_balance(balance.confirmed, balance.unconfirmed),
                ..DerivedAddress::unused(address.clone())
            })
            .collect())
    }
}

#[async_trait]
impl AddressUsageSource for ElectrumClient {
    async fn fetch_usage(&self, addresses: &[String]) -> Result<Vec<DerivedAddress>, NetworkError> {
        let client = self.clone();
        let addresses = addresses.to_vec();
        let usage = tokio::task::spawn_blocking(move || client.get_usage(&addresses))
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))??;
        Ok(usage)
    }
}

fn address_scripts(params: &ChainParams, addresses: &[String]) -> Result<Vec<ScriptBuf>, Error> {
    addresses
        .iter()
        .map(|address| {
            if Xpub::from_str(address).is_ok() {
                return Err(Error::ExtendedKey(address.clone()));
            }
            decode_address(params, address).map_err(|source| Error::InvalidAddress {
                address: address.clone(),
                source,
            })
        })
        .collect()
}

fn check_length(expected: usize, got: usize) -> Result<(), Error> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::ResponseLength { expected, got })
    }
}

/// Confirmed plus unconfirmed, which can be negative (pending spends)
fn net_balance(confirmed: u64, unconfirmed: i64) -> Amount {
    let total = confirmed as i64 + unconfirmed;
    Amount::from_sat(total.max(0) as u64)
}

/// Default Electrum servers for each chain and network
pub fn default_server(params: &ChainParams) -> &'static str {
    match (params.chain, params.network) {
        (Chain::Bitcoin, Network::Bitcoin) => "ssl://electrum.blockstream.info:60002",
        (Chain::Bitcoin, Network::Testnet) => "ssl://electrum.blockstream.info:60004",
        (Chain::Bitcoin, Network::Signet) => "ssl://mempool.space:60602",
        (Chain::BitcoinCash, Network::Bitcoin) => "ssl://bch.imaginary.cash:50002",
        (Chain::BitcoinCash, Network::Testnet) => "ssl://testnet.imaginary.cash:50002",
        (_, Network::Regtest) => "tcp://127.0.0.1:60401",
        (Chain::Bitcoin, _) => "ssl://electrum.blockstream.info:60002",
        (Chain::BitcoinCash, _) => "ssl://bch.imaginary.cash:50002",
    }
}
