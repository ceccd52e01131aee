//! Signature hash for `SIGHASH_FORKID` chains
//!
//! The `bitcoin` crate only commits to standard sighash types, so the
//! fork-id digest is assembled here. It is the BIP-143 preimage applied to
//! every input (not only segwit ones) with the fork-id sighash type:
//!
//! ```text
//! version || hashPrevouts || hashSequence || outpoint || scriptCode ||
//! value || nSequence || hashOutputs || locktime || sighashType
//! ```

use bitcoin::consensus::serialize;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{Amount, Script, Transaction};

use crate::SigningError;

/// Digest to sign for input `input_index` spending `value` locked by `script_code`
pub fn forkid_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    value: Amount,
    sighash_type: u32,
) -> Result<sha256d::Hash, SigningError> {
    let txin = tx.input.get(input_index).ok_or_else(|| {
        SigningError::SigningFailure(format!(
            "input {} out of range ({} inputs)",
            input_index,
            tx.input.len()
        ))
    })?;

    let mut prevouts = Vec::with_capacity(36 * tx.input.len());
    let mut sequences = Vec::with_capacity(4 * tx.input.len());
    for input in &tx.input {
        prevouts.extend_from_slice(&serialize(&input.previous_output));
        sequences.extend_from_slice(&input.sequence.0.to_le_bytes());
    }

    let mut outputs = Vec::new();
    for output in &tx.output {
        outputs.extend_from_slice(&serialize(output));
    }

    let mut preimage = Vec::with_capacity(156 + script_code.len());
    preimage.extend_from_slice(&tx.version.0.to_le_bytes());
    preimage.extend_from_slice(sha256d::Hash::hash(&prevouts).as_byte_array());
    preimage.extend_from_slice(sha256d::Hash::hash(&sequences).as_byte_array());
    preimage.extend_from_slice(&serialize(&txin.previous_output));
    preimage.extend_from_slice(&serialize(&script_code.to_owned()));
    preimage.extend_from_slice(&value.to_sat().to_le_bytes());
    preimage.extend_from_slice(&txin.sequence.0.to_le_bytes());
    preimage.extend_from_slice(sha256d::Hash::hash(&outputs).as_byte_array());
    preimage.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());

    Ok(sha256d::Hash::hash(&preimage))
}
