//! Transaction signing
//!
//! Every wallet input is unlocked with the key at the same position in
//! `private_keys`. The key must hash to the input's locking script:
//!
//! - P2PKH: scriptSig `<sig> <pubkey>`, compressed or uncompressed key
//! - P2WPKH (Bitcoin only): witness `[<sig>, <pubkey>]`
//!
//! The replay protection input is left unsigned; its holder unlocks it with
//! the returned secret.

use bitcoin::consensus::serialize;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{PublicKey, ScriptBuf, Transaction, Witness};
use hdspend_core::{
    decode_address, ChainParams, PrivateKeyBytes, SighashMode, SigningInput, SigningOutput,
    UnspentOutput,
};

use crate::plan::TransactionPlan;
use crate::sighash::forkid_signature_hash;
use crate::SigningError;

/// How one input ends up unlocked
enum Unlock {
    ScriptSig(ScriptBuf),
    Witness(Witness),
}

/// Signs [`SigningInput`]s for one chain
pub struct TransactionSigner {
    params: ChainParams,
    secp: Secp256k1<All>,
}

impl TransactionSigner {
    pub fn new(params: ChainParams) -> Self {
        Self {
            params,
            secp: Secp256k1::new(),
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Validate, lay out, sign and serialize.
    ///
    /// Either every wallet input is signed or an error is returned; no
    /// partially signed transaction ever leaves this function. Key material
    /// is dropped (and zeroed) with `input`.
    pub fn sign(&self, input: SigningInput) -> Result<SigningOutput, SigningError> {
        let destination = decode_address(&self.params, &input.destination_address)
            .map_err(SigningError::InvalidDestinationAddress)?;
        let change = decode_address(&self.params, &input.change_address)
            .map_err(SigningError::InvalidChangeAddress)?;

        if input.private_keys.len() != input.spendable_outputs.len() {
            return Err(SigningError::SigningFailure(format!(
                "{} private keys for {} inputs",
                input.private_keys.len(),
                input.spendable_outputs.len()
            )));
        }

        let plan = TransactionPlan::build(&self.params, &input, destination, change)?;
        log::debug!(
            "Signing {} {} inputs, {} outputs",
            plan.wallet_inputs,
            self.params.chain.name(),
            plan.unsigned.output.len()
        );

        let signed = self.sign_plan(&plan, &input.private_keys)?;

        Ok(SigningOutput {
            serialized_transaction: serialize(&signed),
            transaction_hash: signed.compute_txid().to_string(),
            replay_protection_unlock_secret: input
                .replay_protection
                .as_ref()
                .map(|rp| rp.unlock_secret.clone()),
        })
    }

    fn sign_plan(
        &self,
        plan: &TransactionPlan,
        keys: &[PrivateKeyBytes],
    ) -> Result<Transaction, SigningError> {
        let unsigned = &plan.unsigned;
        let mut cache = SighashCache::new(unsigned);

        // All digests commit to the unsigned transaction
        let mut unlocks = Vec::with_capacity(plan.wallet_inputs);
        for (index, (prevout, key)) in plan.prevouts.iter().zip(keys).enumerate() {
            unlocks.push(self.sign_input(unsigned, &mut cache, index, prevout, key)?);
        }

        let mut signed = unsigned.clone();
        for (txin, unlock) in signed.input.iter_mut().zip(unlocks) {
            match unlock {
                Unlock::ScriptSig(script) => txin.script_sig = script,
                Unlock::Witness(witness) => txin.witness = witness,
            }
        }
        Ok(signed)
    }

    fn sign_input(
        &self,
        unsigned: &Transaction,
        cache: &mut SighashCache<&Transaction>,
        index: usize,
        prevout: &UnspentOutput,
        key: &PrivateKeyBytes,
    ) -> Result<Unlock, SigningError> {
        let mut secret = key.to_secret_key().map_err(|e| {
            SigningError::SigningFailure(format!("input {}: malformed private key: {}", index, e))
        })?;
        let unlock = self.unlock_input(unsigned, cache, index, prevout, &secret);
        secret.non_secure_erase();
        unlock
    }

    fn unlock_input(
        &self,
        unsigned: &Transaction,
        cache: &mut SighashCache<&Transaction>,
        index: usize,
        prevout: &UnspentOutput,
        secret: &SecretKey,
    ) -> Result<Unlock, SigningError> {
        let locking = &prevout.locking_script;

        if locking.is_p2pkh() {
            let pubkey = self.matching_p2pkh_key(secret, locking).ok_or_else(|| {
                SigningError::SigningFailure(format!(
                    "input {}: private key does not match locking script",
                    index
                ))
            })?;

            let digest: [u8; 32] = match self.params.sighash {
                SighashMode::Legacy => cache
                    .legacy_signature_hash(index, locking, self.params.sighash.sighash_type())
                    .map_err(|e| SigningError::SigningFailure(e.to_string()))?
                    .to_byte_array(),
                SighashMode::ForkId { .. } => forkid_signature_hash(
                    unsigned,
                    index,
                    locking,
                    prevout.value,
                    self.params.sighash.sighash_type(),
                )?
                .to_byte_array(),
            };

            let suffix = self.params.sighash.signature_suffix();
            let signature = self.signature_bytes(secret, digest, suffix);
            let signature = PushBytesBuf::try_from(signature)
                .map_err(|e| SigningError::SigningFailure(e.to_string()))?;
            let script_sig = Builder::new()
                .push_slice(signature)
                .push_key(&pubkey)
                .into_script();
            return Ok(Unlock::ScriptSig(script_sig));
        }

        if locking.is_p2wpkh() && self.params.sighash == SighashMode::Legacy {
            let pubkey = PublicKey::new(secret.public_key(&self.secp));
            let expected = pubkey
                .wpubkey_hash()
                .map(|hash| ScriptBuf::new_p2wpkh(&hash))
                .map_err(|e| SigningError::SigningFailure(e.to_string()))?;
            if &expected != locking {
                return Err(SigningError::SigningFailure(format!(
                    "input {}: private key does not match locking script",
                    index
                )));
            }

            let digest = cache
                .p2wpkh_signature_hash(index, locking, prevout.value, EcdsaSighashType::All)
                .map_err(|e| SigningError::SigningFailure(e.to_string()))?
                .to_byte_array();

            let signature = self.signature_bytes(secret, digest, EcdsaSighashType::All as u8);
            let witness = Witness::from_slice(&[signature, pubkey.to_bytes()]);
            return Ok(Unlock::Witness(witness));
        }

        Err(SigningError::SigningFailure(format!(
            "input {}: unsupported locking script {}",
            index, locking
        )))
    }

    /// The public key (compressed first) whose hash is in `locking`
    fn matching_p2pkh_key(&self, secret: &SecretKey, locking: &ScriptBuf) -> Option<PublicKey> {
        let inner = secret.public_key(&self.secp);
        [PublicKey::new(inner), PublicKey::new_uncompressed(inner)]
            .into_iter()
            .find(|pk| &ScriptBuf::new_p2pkh(&pk.pubkey_hash()) == locking)
    }

    /// DER signature followed by the sighash byte
    fn signature_bytes(&self, secret: &SecretKey, digest: [u8; 32], suffix: u8) -> Vec<u8> {
        let signature = self.secp.sign_ecdsa(&Message::from_digest(digest), secret);
        let mut bytes = signature.serialize_der().to_vec();
        bytes.push(suffix);
        bytes
    }
}
