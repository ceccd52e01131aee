//! Chain-aware address decoding and encoding

use std::str::FromStr;

use bitcoin::{Address, CompressedPublicKey, ScriptBuf};

use crate::cashaddr::{CashAddr, CashAddrKind};
use crate::chain::{AddressFormat, ChainParams};
use crate::AddressError;

/// Decode an address into the output script it pays to.
///
/// CashAddr chains accept addresses with or without the network prefix; a
/// prefix that belongs to another network is rejected.
pub fn decode_address(params: &ChainParams, address: &str) -> Result<ScriptBuf, AddressError> {
    match &params.address_format {
        AddressFormat::Bitcoin => {
            let parsed = Address::from_str(address)
                .map_err(|e| AddressError::InvalidFormat(e.to_string()))?;
            let checked = parsed
                .require_network(params.network)
                .map_err(|_| AddressError::WrongNetwork {
                    expected: params.network.to_string(),
                    found: address.to_string(),
                })?;
            Ok(checked.script_pubkey())
        }
        AddressFormat::CashAddr { prefix } => Ok(decode_cashaddr(address, prefix)?.script_pubkey()),
    }
}

/// Decode a CashAddr string, retrying with the canonical prefix prepended.
pub fn decode_cashaddr(address: &str, prefix: &str) -> Result<CashAddr, AddressError> {
    let decoded = match CashAddr::decode(address) {
        Ok(decoded) => decoded,
        Err(first) => {
            if address.contains(':') {
                return Err(first);
            }
            // Match the payload's case so an all-uppercase (QR) address stays single-case
            let retry = if address.bytes().any(|b| b.is_ascii_lowercase()) {
                format!("{}:{}", prefix, address)
            } else {
                format!("{}:{}", prefix.to_ascii_uppercase(), address)
            };
            CashAddr::decode(&retry)?
        }
    };

    if decoded.prefix != prefix {
        return Err(AddressError::WrongNetwork {
            expected: prefix.to_string(),
            found: decoded.prefix,
        });
    }
    Ok(decoded)
}

/// Encode a 160-bit hash as a prefixed CashAddr string
pub fn encode_cashaddr(prefix: &str, kind: CashAddrKind, hash: [u8; 20]) -> String {
    CashAddr::new(prefix, kind, hash).encode()
}

/// Whether `address` is a valid address on this chain
pub fn is_valid_address(params: &ChainParams, address: &str) -> bool {
    decode_address(params, address).is_ok()
}

/// Pay-to-pubkey-hash address for a public key, in the chain's native format
pub fn p2pkh_address(params: &ChainParams, pubkey: &CompressedPublicKey) -> String {
    match &params.address_format {
        AddressFormat::Bitcoin => Address::p2pkh(pubkey.pubkey_hash(), params.network).to_string(),
        AddressFormat::CashAddr { prefix } => {
            use bitcoin::hashes::Hash;
            encode_cashaddr(prefix, CashAddrKind::P2pkh, pubkey.pubkey_hash().to_byte_array())
        }
    }
}

/// Native segwit v0 address for a public key (Bitcoin only)
pub fn p2wpkh_address(params: &ChainParams, pubkey: &CompressedPublicKey) -> Option<String> {
    match params.address_format {
        AddressFormat::Bitcoin => Some(Address::p2wpkh(pubkey, params.network).to_string()),
        AddressFormat::CashAddr { .. } => None,
    }
}
