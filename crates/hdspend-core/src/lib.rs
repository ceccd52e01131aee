//! hdspend Core
//!
//! Shared types for account discovery and UTXO transaction signing.
//!
//! # Chains
//!
//! Chain-specific behaviour is described by a [`ChainParams`] value:
//! - Bitcoin: base58/bech32 addresses, legacy and BIP-143 sighashes
//! - Bitcoin Cash: CashAddr addresses, `SIGHASH_FORKID` digests, replay protection
//!
//! # Key Material
//!
//! Private keys travel as [`PrivateKeyBytes`] and are zeroized on drop.

pub mod address;
pub mod cashaddr;
pub mod chain;
pub mod keys;
pub mod seed;
pub mod types;

pub use address::{decode_address, decode_cashaddr, encode_cashaddr, is_valid_address};
pub use cashaddr::{CashAddr, CashAddrKind};
pub use chain::{AddressFormat, Chain, ChainParams, SighashMode};
pub use keys::{AccountXpubDeriver, AddressDeriver, KeyError, PrivateKeyBytes, Purpose};
pub use types::*;

use thiserror::Error;

/// Errors from data-source collaborators, passed through unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Server returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Address decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    #[error("Address checksum mismatch")]
    InvalidChecksum,

    #[error("Address mixes upper and lower case")]
    MixedCase,

    #[error("Address is for another network: expected {expected}, found {found}")]
    WrongNetwork { expected: String, found: String },

    #[error("Unsupported address type: {0}")]
    UnsupportedType(String),
}
