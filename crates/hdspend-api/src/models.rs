//! Wire models for the wallet data API

use std::str::FromStr;

use bitcoin::{Amount, ScriptBuf, Txid};
use hdspend_core::{DerivedAddress, NetworkError, ReplayProtectionParameters, UnspentOutput};
use serde::{Deserialize, Serialize};

/// Response of `GET /multiaddr`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiAddressResponse {
    #[serde(default)]
    pub addresses: Vec<AddressSummary>,
}

/// Per-address usage as reported by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSummary {
    pub address: String,
    pub n_tx: u64,
    #[serde(default)]
    pub total_received: u64,
    #[serde(default)]
    pub total_sent: u64,
    #[serde(default)]
    pub final_balance: u64,
    #[serde(default)]
    pub account_index: u32,
    #[serde(default)]
    pub change_index: u32,
}

impl From<AddressSummary> for DerivedAddress {
    fn from(s: AddressSummary) -> Self {
        DerivedAddress {
            account_index: s.account_index,
            address: s.address,
            change_index: s.change_index,
            transaction_count: s.n_tx,
            total_received: Some(Amount::from_sat(s.total_received)),
            total_sent: Some(Amount::from_sat(s.total_sent)),
            final_balance: Amount::from_sat(s.final_balance),
        }
    }
}

/// Response of `GET /bch/dust`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DustResponse {
    /// Txid in display (big-endian) hex
    pub tx_hash_big_endian: String,
    pub tx_output_n: u32,
    /// Locking script of the bound output, hex
    pub script: String,
    pub value: u64,
    /// Script for the new dust output, hex
    pub output_script: String,
    pub lock_secret: String,
}

impl TryFrom<DustResponse> for ReplayProtectionParameters {
    type Error = NetworkError;

    fn try_from(d: DustResponse) -> Result<Self, Self::Error> {
        let transaction_hash = Txid::from_str(&d.tx_hash_big_endian)
            .map_err(|e| NetworkError::Decode(format!("dust tx_hash_big_endian: {}", e)))?;
        let locking_script = decode_script("script", &d.script)?;
        let output_script = decode_script("output_script", &d.output_script)?;
        let amount = Amount::from_sat(d.value);

        Ok(ReplayProtectionParameters {
            bound_output: UnspentOutput {
                transaction_hash,
                output_index: d.tx_output_n,
                value: amount,
                locking_script,
            },
            amount,
            output_script,
            unlock_secret: d.lock_secret,
        })
    }
}

fn decode_script(field: &str, hex_script: &str) -> Result<ScriptBuf, NetworkError> {
    hex::decode(hex_script)
        .map(ScriptBuf::from_bytes)
        .map_err(|e| NetworkError::Decode(format!("dust {}: {}", field, e)))
}
