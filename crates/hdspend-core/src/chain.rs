//! Chain descriptions
//!
//! Every chain-specific rule the engine needs (address encoding, signature
//! hash flags, transaction version, replay protection) lives in one
//! [`ChainParams`] value instead of one implementation per coin.

use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// Sign all inputs and all outputs
pub const SIGHASH_ALL: u32 = 0x01;

/// Fork-identifying flag mixed into the sighash type on replay-protected chains
pub const SIGHASH_FORKID: u32 = 0x40;

/// BIP-44 coin type for Bitcoin mainnet
pub const COIN_TYPE_BITCOIN: u32 = 0;

/// BIP-44 coin type for Bitcoin Cash mainnet
pub const COIN_TYPE_BITCOIN_CASH: u32 = 145;

/// BIP-44 coin type shared by all test networks
pub const COIN_TYPE_TESTNET: u32 = 1;

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Bitcoin,
    BitcoinCash,
}

impl Chain {
    /// Short ticker-style name
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "btc",
            Chain::BitcoinCash => "bch",
        }
    }
}

/// How addresses are written on a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFormat {
    /// Base58check and bech32/bech32m, as understood by the `bitcoin` crate
    Bitcoin,
    /// CashAddr with a mandatory network prefix
    CashAddr { prefix: String },
}

/// Signature hash algorithm used for P2PKH inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SighashMode {
    /// Original Satoshi digest (BIP-143 for segwit inputs)
    Legacy,
    /// BIP-143 style digest for every input with `SIGHASH_FORKID` set
    ForkId { fork_id: u32 },
}

impl SighashMode {
    /// The 32-bit sighash type committed to in the digest
    pub fn sighash_type(&self) -> u32 {
        match self {
            SighashMode::Legacy => SIGHASH_ALL,
            SighashMode::ForkId { fork_id } => SIGHASH_ALL | SIGHASH_FORKID | (fork_id << 8),
        }
    }

    /// The byte appended to each DER signature
    pub fn signature_suffix(&self) -> u8 {
        (self.sighash_type() & 0xff) as u8
    }
}

/// Everything chain-specific the engine needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub chain: Chain,
    pub network: Network,
    pub address_format: AddressFormat,
    pub sighash: SighashMode,
    /// Transaction version field
    pub tx_version: i32,
    /// Whether transactions carry a replay-protection ("dust") input/output pair
    pub replay_protection: bool,
    /// BIP-44 coin type used for account derivation
    pub coin_type: u32,
}

impl ChainParams {
    /// Bitcoin on the given network
    pub fn bitcoin(network: Network) -> Self {
        Self {
            chain: Chain::Bitcoin,
            network,
            address_format: AddressFormat::Bitcoin,
            sighash: SighashMode::Legacy,
            tx_version: 1,
            replay_protection: false,
            coin_type: coin_type(COIN_TYPE_BITCOIN, network),
        }
    }

    /// Bitcoin Cash on the given network
    pub fn bitcoin_cash(network: Network) -> Self {
        Self {
            chain: Chain::BitcoinCash,
            network,
            address_format: AddressFormat::CashAddr {
                prefix: cashaddr_prefix(network).to_string(),
            },
            sighash: SighashMode::ForkId { fork_id: 0 },
            tx_version: 2,
            replay_protection: true,
            coin_type: coin_type(COIN_TYPE_BITCOIN_CASH, network),
        }
    }

    /// Look up a chain by name ("btc", "bitcoin", "bch", "bitcoin_cash")
    pub fn from_name(name: &str, network: Network) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "btc" | "bitcoin" => Some(Self::bitcoin(network)),
            "bch" | "bitcoin_cash" | "bitcoincash" => Some(Self::bitcoin_cash(network)),
            _ => None,
        }
    }

    /// The canonical CashAddr prefix, if this chain uses CashAddr
    pub fn cashaddr_prefix(&self) -> Option<&str> {
        match &self.address_format {
            AddressFormat::CashAddr { prefix } => Some(prefix),
            AddressFormat::Bitcoin => None,
        }
    }
}

/// CashAddr prefix for a network
pub fn cashaddr_prefix(network: Network) -> &'static str {
    match network {
        Network::Bitcoin => "bitcoincash",
        Network::Regtest => "bchreg",
        _ => "bchtest",
    }
}

fn coin_type(mainnet: u32, network: Network) -> u32 {
    match network {
        Network::Bitcoin => mainnet,
        _ => COIN_TYPE_TESTNET,
    }
}

/// Parse a network name. Unknown names fall back to mainnet.
pub fn parse_network(name: &str) -> Network {
    match name {
        "testnet" | "testnet3" => Network::Testnet,
        "signet" => Network::Signet,
        "regtest" => Network::Regtest,
        _ => Network::Bitcoin,
    }
}
