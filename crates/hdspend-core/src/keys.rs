//! Key material and HD derivation
//!
//! Raw private keys cross the signing boundary as [`PrivateKeyBytes`], which
//! zeroizes on drop. The derivers here produce the identifiers that account
//! discovery probes: account-level xpubs (one per derivation purpose) or
//! receive addresses derived from a single xpub.

use std::fmt;

use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::{All, Secp256k1, SecretKey};
use bitcoin::{CompressedPublicKey, Network};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::address::{p2pkh_address, p2wpkh_address};
use crate::chain::{Chain, ChainParams};

/// First hardened index; everything below is derivable as a normal child
const HARDENED_OFFSET: u32 = 0x8000_0000;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Raw private key bytes, wiped from memory when dropped
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyBytes(Vec<u8>);

impl PrivateKeyBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn from_secret_key(secret: &SecretKey) -> Self {
        Self(secret.secret_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parse into a secp256k1 secret key
    pub fn to_secret_key(&self) -> Result<SecretKey, KeyError> {
        SecretKey::from_slice(&self.0).map_err(|e| KeyError::DerivationFailed(e.to_string()))
    }
}

impl fmt::Debug for PrivateKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKeyBytes(<{} bytes redacted>)", self.0.len())
    }
}

/// Derivation purpose (the first hardened path level)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// BIP-44, pay-to-pubkey-hash
    Legacy,
    /// BIP-84, native segwit v0
    Segwit,
}

impl Purpose {
    pub fn index(&self) -> u32 {
        match self {
            Purpose::Legacy => 44,
            Purpose::Segwit => 84,
        }
    }

    /// Purposes an account is discovered over on a chain
    pub fn for_chain(chain: Chain) -> Vec<Purpose> {
        match chain {
            Chain::Bitcoin => vec![Purpose::Legacy, Purpose::Segwit],
            Chain::BitcoinCash => vec![Purpose::Legacy],
        }
    }
}

/// Derive the master extended private key from a BIP-39 seed
pub fn derive_master(seed: &[u8; 64], network: Network) -> Result<Xpriv, KeyError> {
    Xpriv::new_master(network, seed).map_err(|e| KeyError::DerivationFailed(e.to_string()))
}

/// `m/purpose'/coin_type'/account'`
pub fn account_path(purpose: Purpose, coin_type: u32, account: u32) -> Result<DerivationPath, KeyError> {
    let hardened = |index: u32| {
        ChildNumber::from_hardened_idx(index).map_err(|e| KeyError::InvalidPath(e.to_string()))
    };
    Ok(DerivationPath::from(vec![
        hardened(purpose.index())?,
        hardened(coin_type)?,
        hardened(account)?,
    ]))
}

/// Derive the private key at `path` below `master`
pub fn derive_signing_key(
    master: &Xpriv,
    path: &DerivationPath,
) -> Result<PrivateKeyBytes, KeyError> {
    let derived = master
        .derive_priv(&Secp256k1::new(), path)
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
    Ok(PrivateKeyBytes::from_secret_key(&derived.private_key))
}

/// Number of accounts a wallet import should create.
///
/// A fresh wallet always gets one account, even when discovery found none.
pub fn accounts_to_restore(discovered: u32) -> u32 {
    discovered.max(1)
}

/// Yields the account-level xpubs for each account index.
///
/// An account counts as used when any of its purposes has history, so every
/// index maps to one xpub per purpose.
pub struct AccountXpubDeriver {
    master: Xpriv,
    coin_type: u32,
    purposes: Vec<Purpose>,
    secp: Secp256k1<All>,
}

impl AccountXpubDeriver {
    pub fn new(master: Xpriv, coin_type: u32, purposes: Vec<Purpose>) -> Self {
        Self {
            master,
            coin_type,
            purposes,
            secp: Secp256k1::new(),
        }
    }

    /// Deriver using the chain's coin type and discovery purposes
    pub fn for_chain(master: Xpriv, params: &ChainParams) -> Self {
        Self::new(master, params.coin_type, Purpose::for_chain(params.chain))
    }

    /// Xpubs for `account`, or `None` past the hardened index range
    pub fn derive(&self, account: u32) -> Result<Option<Vec<String>>, KeyError> {
        if account >= HARDENED_OFFSET {
            return Ok(None);
        }

        let mut xpubs = Vec::with_capacity(self.purposes.len());
        for purpose in &self.purposes {
            let path = account_path(*purpose, self.coin_type, account)?;
            let xpriv = self
                .master
                .derive_priv(&self.secp, &path)
                .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
            xpubs.push(Xpub::from_priv(&self.secp, &xpriv).to_string());
        }
        Ok(Some(xpubs))
    }
}

/// Yields receive addresses (`/0/i`) below a single extended public key
pub struct AddressDeriver {
    xpub: Xpub,
    purpose: Purpose,
    params: ChainParams,
    secp: Secp256k1<All>,
}

impl AddressDeriver {
    pub fn new(xpub: Xpub, purpose: Purpose, params: ChainParams) -> Self {
        Self {
            xpub,
            purpose,
            params,
            secp: Secp256k1::new(),
        }
    }

    /// Receive address at `index`, or `None` past the non-hardened range
    pub fn derive(&self, index: u32) -> Result<Option<String>, KeyError> {
        if index >= HARDENED_OFFSET {
            return Ok(None);
        }

        let path = [ChildNumber::Normal { index: 0 }, ChildNumber::Normal { index }];
        let child = self
            .xpub
            .derive_pub(&self.secp, &path)
            .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
        let pubkey = CompressedPublicKey(child.public_key);

        let address = match self.purpose {
            Purpose::Segwit => p2wpkh_address(&self.params, &pubkey).ok_or_else(|| {
                KeyError::DerivationFailed(format!(
                    "segwit addresses are not supported on {}",
                    self.params.chain.name()
                ))
            })?,
            Purpose::Legacy => p2pkh_address(&self.params, &pubkey),
        };
        Ok(Some(address))
    }
}
