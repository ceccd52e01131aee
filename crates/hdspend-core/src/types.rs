//! Values exchanged between the engine and its collaborators.
//!
//! All of them live for a single discovery or signing call.

use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};

use crate::keys::PrivateKeyBytes;

/// Usage data reported by the data source for one probed address or xpub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub account_index: u32,
    pub address: String,
    pub change_index: u32,
    pub transaction_count: u64,
    /// Not every source reports lifetime totals (Electrum does not)
    pub total_received: Option<Amount>,
    pub total_sent: Option<Amount>,
    pub final_balance: Amount,
}

impl DerivedAddress {
    /// An address with no history
    pub fn unused(address: impl Into<String>) -> Self {
        Self {
            account_index: 0,
            address: address.into(),
            change_index: 0,
            transaction_count: 0,
            total_received: None,
            total_sent: None,
            final_balance: Amount::ZERO,
        }
    }

    pub fn is_used(&self) -> bool {
        self.transaction_count > 0
    }
}

/// A spendable output selected by coin selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub transaction_hash: Txid,
    pub output_index: u32,
    pub value: Amount,
    pub locking_script: ScriptBuf,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.transaction_hash,
            vout: self.output_index,
        }
    }
}

/// Server-issued data for the replay-protection input/output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayProtectionParameters {
    /// Single-use output the transaction must spend
    pub bound_output: UnspentOutput,
    pub amount: Amount,
    pub output_script: ScriptBuf,
    /// Handed back to the server at broadcast to complete the bound input
    pub unlock_secret: String,
}

/// What the caller wants signed. Keys correspond 1:1 with `spendable_outputs`.
#[derive(Debug, Clone)]
pub struct SigningCandidate {
    pub spendable_outputs: Vec<UnspentOutput>,
    pub amount: Amount,
    pub change: Amount,
    pub private_keys: Vec<PrivateKeyBytes>,
    pub destination_address: String,
    pub change_address: String,
}

/// Fully resolved signer input.
///
/// `amount + change + fee == sum(spendable_outputs.value)` is the caller's
/// responsibility and is not re-checked.
#[derive(Debug, Clone)]
pub struct SigningInput {
    pub spendable_outputs: Vec<UnspentOutput>,
    pub amount: Amount,
    pub change: Amount,
    pub private_keys: Vec<PrivateKeyBytes>,
    pub destination_address: String,
    pub change_address: String,
    pub replay_protection: Option<ReplayProtectionParameters>,
}

impl SigningInput {
    pub fn new(
        candidate: SigningCandidate,
        replay_protection: Option<ReplayProtectionParameters>,
    ) -> Self {
        let SigningCandidate {
            spendable_outputs,
            amount,
            change,
            private_keys,
            destination_address,
            change_address,
        } = candidate;

        Self {
            spendable_outputs,
            amount,
            change,
            private_keys,
            destination_address,
            change_address,
            replay_protection,
        }
    }

    /// Total value of the wallet's own inputs
    pub fn input_total(&self) -> Amount {
        self.spendable_outputs.iter().map(|u| u.value).sum()
    }
}

/// A signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningOutput {
    #[serde(with = "hex_bytes")]
    pub serialized_transaction: Vec<u8>,
    /// Txid in display (byte-reversed) hex
    pub transaction_hash: String,
    pub replay_protection_unlock_secret: Option<String>,
}

impl SigningOutput {
    pub fn serialized_hex(&self) -> String {
        bitcoin::hex::DisplayHex::to_lower_hex_string(&self.serialized_transaction[..])
    }
}

mod hex_bytes {
    use bitcoin::hex::{DisplayHex, FromHex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&bytes.to_lower_hex_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        Vec::<u8>::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
