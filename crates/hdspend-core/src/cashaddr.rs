//! CashAddr: checksummed Bitcoin Cash address encoding
//!
//! Format: `<prefix>:<payload><checksum>` where the payload is a version byte
//! followed by a 160-bit hash, regrouped into 5-bit words and written with the
//! bech32 charset. The checksum is a 40-bit BCH code over GF(32) that also
//! covers the prefix, so an address for one network never validates for another.
//!
//! Reference: https://github.com/bitcoincashorg/bitcoincash.org/blob/master/spec/cashaddr.md

use bitcoin::hashes::Hash;
use bitcoin::{PubkeyHash, ScriptBuf, ScriptHash};

use crate::AddressError;

/// Bech32 character set
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Generator coefficients for the CashAddr polymod
const GEN: [u64; 5] = [
    0x98f2bc8e61,
    0x79b76d99e2,
    0xf33e5fb3c4,
    0xae2eabe2a8,
    0x1e4f43e470,
];

/// Number of 5-bit checksum words
const CHECKSUM_LEN: usize = 8;

/// Hash length for version size code 0
const HASH_LEN: usize = 20;

/// Address type carried in the version byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashAddrKind {
    P2pkh = 0,
    P2sh = 1,
}

/// A decoded CashAddr address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashAddr {
    /// Lowercase network prefix ("bitcoincash", "bchtest", "bchreg")
    pub prefix: String,
    pub kind: CashAddrKind,
    pub hash: [u8; HASH_LEN],
}

impl CashAddr {
    pub fn new(prefix: &str, kind: CashAddrKind, hash: [u8; HASH_LEN]) -> Self {
        Self {
            prefix: prefix.to_ascii_lowercase(),
            kind,
            hash,
        }
    }

    /// Encode as `<prefix>:<payload>`
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(1 + HASH_LEN);
        // Size code 0 = 160-bit hash
        payload.push((self.kind as u8) << 3);
        payload.extend_from_slice(&self.hash);

        let mut words = convert_bits(&payload, 8, 5, true).unwrap_or_default();
        let checksum = create_checksum(&self.prefix, &words);
        words.extend_from_slice(&checksum);

        let mut out = String::with_capacity(self.prefix.len() + 1 + words.len());
        out.push_str(&self.prefix);
        out.push(':');
        for w in words {
            out.push(CHARSET[w as usize] as char);
        }
        out
    }

    /// Decode a prefixed CashAddr string.
    ///
    /// The prefix is mandatory here; callers that accept bare payloads retry
    /// with the canonical prefix (see [`crate::address::decode_cashaddr`]).
    pub fn decode(address: &str) -> Result<Self, AddressError> {
        let has_lower = address.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = address.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressError::MixedCase);
        }
        let address = address.to_ascii_lowercase();

        let (prefix, payload) = address
            .rsplit_once(':')
            .ok_or_else(|| AddressError::InvalidFormat("missing prefix".into()))?;
        if prefix.is_empty() {
            return Err(AddressError::InvalidFormat("empty prefix".into()));
        }
        if payload.len() <= CHECKSUM_LEN {
            return Err(AddressError::InvalidFormat("payload too short".into()));
        }

        let words = payload
            .bytes()
            .map(|c| {
                CHARSET
                    .iter()
                    .position(|&x| x == c)
                    .map(|p| p as u8)
                    .ok_or_else(|| {
                        AddressError::InvalidFormat(format!("invalid character '{}'", c as char))
                    })
            })
            .collect::<Result<Vec<u8>, _>>()?;

        if !verify_checksum(prefix, &words) {
            return Err(AddressError::InvalidChecksum);
        }

        let data = convert_bits(&words[..words.len() - CHECKSUM_LEN], 5, 8, false)
            .ok_or_else(|| AddressError::InvalidFormat("invalid padding".into()))?;

        let (version, hash) = data
            .split_first()
            .ok_or_else(|| AddressError::InvalidFormat("empty payload".into()))?;
        if version & 0x80 != 0 {
            return Err(AddressError::InvalidFormat("reserved version bit set".into()));
        }
        if version & 0x07 != 0 || hash.len() != HASH_LEN {
            return Err(AddressError::UnsupportedType(format!(
                "hash size code {} with {} bytes",
                version & 0x07,
                hash.len()
            )));
        }
        let kind = match version >> 3 {
            0 => CashAddrKind::P2pkh,
            1 => CashAddrKind::P2sh,
            other => {
                return Err(AddressError::UnsupportedType(format!(
                    "address type {}",
                    other
                )))
            }
        };

        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(hash);
        Ok(Self {
            prefix: prefix.to_string(),
            kind,
            hash: bytes,
        })
    }

    /// The output script paying to this address
    pub fn script_pubkey(&self) -> ScriptBuf {
        match self.kind {
            CashAddrKind::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(self.hash)),
            CashAddrKind::P2sh => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(self.hash)),
        }
    }
}

/// Compute the CashAddr polymod over 5-bit values
fn polymod(values: &[u8]) -> u64 {
    let mut c: u64 = 1;

    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ (d as u64);
        for (i, g) in GEN.iter().enumerate() {
            if (c0 >> i) & 1 != 0 {
                c ^= g;
            }
        }
    }

    c ^ 1
}

/// Lower 5 bits of each prefix character, then a zero separator
fn expand_prefix(prefix: &str) -> Vec<u8> {
    let mut values: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    values.push(0);
    values
}

/// Create the 8-word checksum for a payload
fn create_checksum(prefix: &str, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = expand_prefix(prefix);
    values.extend_from_slice(payload);
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);

    let m = polymod(&values);
    let mut out = [0u8; CHECKSUM_LEN];
    for (i, word) in out.iter_mut().enumerate() {
        *word = ((m >> (5 * (CHECKSUM_LEN - 1 - i))) & 0x1f) as u8;
    }
    out
}

/// Verify a payload that ends with its checksum
fn verify_checksum(prefix: &str, data: &[u8]) -> bool {
    let mut values = expand_prefix(prefix);
    values.extend_from_slice(data);
    polymod(&values) == 0
}

/// Regroup bits. Returns `None` on out-of-range input or non-zero padding.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        let v = value as u32;
        if v >> from != 0 {
            return None;
        }
        acc = (acc << from) | v;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & maxv) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & maxv) != 0 {
        return None;
    }

    Some(out)
}
