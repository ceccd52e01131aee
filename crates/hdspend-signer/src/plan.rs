//! Unsigned transaction layout
//!
//! Inputs: the wallet's spendable outputs in the order given, then the
//! replay protection bound output if present.
//!
//! Outputs: destination, then change (omitted when zero), then the replay
//! protection output if present.

use bitcoin::absolute::LockTime;
use bitcoin::transaction::{TxIn, TxOut, Version};
use bitcoin::{Amount, ScriptBuf, Sequence, Transaction, Witness};
use hdspend_core::{ChainParams, SigningInput, UnspentOutput};

use crate::SigningError;

/// An unsigned transaction plus what each of its inputs spends
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    pub unsigned: Transaction,
    /// Spent outputs, one per input, in input order
    pub prevouts: Vec<UnspentOutput>,
    /// Inputs `0..wallet_inputs` are unlocked with wallet keys
    pub wallet_inputs: usize,
}

impl TransactionPlan {
    /// Lay out the transaction for `input`, paying to already-decoded scripts
    pub fn build(
        params: &ChainParams,
        input: &SigningInput,
        destination: ScriptBuf,
        change: ScriptBuf,
    ) -> Result<Self, SigningError> {
        if input.spendable_outputs.is_empty() {
            return Err(SigningError::SigningFailure(
                "no spendable outputs to sign".into(),
            ));
        }

        let mut prevouts = input.spendable_outputs.clone();
        let wallet_inputs = prevouts.len();

        let mut outputs = vec![TxOut {
            value: input.amount,
            script_pubkey: destination,
        }];
        if input.change > Amount::ZERO {
            outputs.push(TxOut {
                value: input.change,
                script_pubkey: change,
            });
        }

        if let Some(rp) = &input.replay_protection {
            prevouts.push(rp.bound_output.clone());
            outputs.push(TxOut {
                value: rp.amount,
                script_pubkey: rp.output_script.clone(),
            });
        }

        let inputs = prevouts
            .iter()
            .map(|utxo| TxIn {
                previous_output: utxo.outpoint(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect();

        Ok(Self {
            unsigned: Transaction {
                version: Version(params.tx_version),
                lock_time: LockTime::ZERO,
                input: inputs,
                output: outputs,
            },
            prevouts,
            wallet_inputs,
        })
    }

    pub fn input_total(&self) -> Amount {
        self.prevouts.iter().map(|p| p.value).sum()
    }

    pub fn output_total(&self) -> Amount {
        self.unsigned.output.iter().map(|o| o.value).sum()
    }

    /// Implied miner fee, or `None` if outputs exceed inputs
    pub fn fee(&self) -> Option<Amount> {
        self.input_total().checked_sub(self.output_total())
    }
}
