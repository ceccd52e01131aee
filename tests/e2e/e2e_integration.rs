//! End-to-end integration test for hdspend.
//!
//! Exercises the complete wallet flow without a live network or real funds:
//!
//! 1. Mnemonic → seed → account xpubs
//! 2. Account discovery over a mocked usage source
//! 3. Receive address derivation matching signing key derivation
//! 4. Assemble + sign with replay protection (Bitcoin Cash)
//! 5. Assemble + sign a segwit spend (Bitcoin)
//!
//! Run with: cargo test --test e2e_integration

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpub};
use bitcoin::consensus::deserialize;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Amount, CompressedPublicKey, Network, ScriptBuf, Transaction, Txid};
use hdspend_core::keys::{
    account_path, accounts_to_restore, derive_master, derive_signing_key,
};
use hdspend_core::seed::{derive_seed, parse_mnemonic};
use hdspend_core::{
    AccountXpubDeriver, AddressDeriver, ChainParams, DerivedAddress, NetworkError,
    PrivateKeyBytes, Purpose, ReplayProtectionParameters, SigningCandidate, UnspentOutput,
};
use hdspend_discovery::{AccountDiscovery, AddressUsageSource, DEFAULT_BATCH_SIZE};
use hdspend_signer::{ReplayProtectionSource, SigningError, SigningOrchestrator};

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

static INIT_LOGGER: Once = Once::new();

fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

// ============================================================================
// Mock collaborators
// ============================================================================

/// Reports one transaction for every identifier in `used`
struct SetUsageSource {
    used: HashSet<String>,
    calls: AtomicUsize,
}

impl SetUsageSource {
    fn new<I: IntoIterator<Item = String>>(used: I) -> Self {
        Self {
            used: used.into_iter().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AddressUsageSource for SetUsageSource {
    async fn fetch_usage(&self, addresses: &[String]) -> Result<Vec<DerivedAddress>, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(addresses
            .iter()
            .map(|a| DerivedAddress {
                transaction_count: u64::from(self.used.contains(a)),
                ..DerivedAddress::unused(a.clone())
            })
            .collect())
    }
}

struct FixedDustSource(ReplayProtectionParameters);

#[async_trait]
impl ReplayProtectionSource for FixedDustSource {
    async fn fetch_replay_protection(&self) -> Result<ReplayProtectionParameters, NetworkError> {
        Ok(self.0.clone())
    }
}

struct DownDustSource;

#[async_trait]
impl ReplayProtectionSource for DownDustSource {
    async fn fetch_replay_protection(&self) -> Result<ReplayProtectionParameters, NetworkError> {
        Err(NetworkError::Transport("connection refused".into()))
    }
}

fn dust() -> ReplayProtectionParameters {
    let script = ScriptBuf::from_bytes(vec![
        0x76, 0xa9, 0x14, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a,
        0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x5a, 0x88, 0xac,
    ]);
    ReplayProtectionParameters {
        bound_output: UnspentOutput {
            transaction_hash: Txid::from_byte_array([0xd0; 32]),
            output_index: 1,
            value: Amount::from_sat(546),
            locking_script: script.clone(),
        },
        amount: Amount::from_sat(546),
        output_script: script,
        unlock_secret: "5ec12e7".into(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn test_master(network: Network) -> bitcoin::bip32::Xpriv {
    let mnemonic = parse_mnemonic(TEST_MNEMONIC).expect("mnemonic");
    let seed = derive_seed(&mnemonic, "");
    derive_master(&seed, network).expect("master key")
}

/// `m/purpose'/coin'/account'/0/index`
fn receive_path(purpose: Purpose, coin_type: u32, account: u32, index: u32) -> DerivationPath {
    account_path(purpose, coin_type, account)
        .expect("account path")
        .extend([
            ChildNumber::Normal { index: 0 },
            ChildNumber::Normal { index },
        ])
}

fn public_key(key: &PrivateKeyBytes) -> CompressedPublicKey {
    let secret = key.to_secret_key().expect("secret key");
    CompressedPublicKey(secret.public_key(&Secp256k1::new()))
}

// ============================================================================
// 1-2. Discovery
// ============================================================================

#[tokio::test]
async fn test_discovery_over_account_xpubs() {
    init_logger();
    let params = ChainParams::bitcoin_cash(Network::Bitcoin);
    let deriver = AccountXpubDeriver::for_chain(test_master(Network::Bitcoin), &params);

    // Accounts 0..3 used, account 4 used but hidden behind the gap at 3
    let used: Vec<String> = [0, 1, 2, 4]
        .iter()
        .flat_map(|&i| deriver.derive(i).unwrap().unwrap())
        .collect();
    let source = Arc::new(SetUsageSource::new(used));
    let discovery = AccountDiscovery::new(source.clone());

    let count = discovery
        .discover_accounts(DEFAULT_BATCH_SIZE, &deriver)
        .await
        .expect("discovery");
    assert_eq!(count, 3);
    assert_eq!(accounts_to_restore(count), 3);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    println!("✓ Discovered {} used accounts", count);
}

#[tokio::test]
async fn test_fresh_wallet_restores_one_account() {
    init_logger();
    let params = ChainParams::bitcoin(Network::Bitcoin);
    let deriver = AccountXpubDeriver::for_chain(test_master(Network::Bitcoin), &params);
    let discovery = AccountDiscovery::new(Arc::new(SetUsageSource::new(Vec::new())));

    let count = discovery.discover_accounts(10, &deriver).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(accounts_to_restore(count), 1);
}

#[tokio::test]
async fn test_discovery_spans_batches() {
    init_logger();
    let params = ChainParams::bitcoin(Network::Bitcoin);
    let deriver = AccountXpubDeriver::for_chain(test_master(Network::Bitcoin), &params);

    // Only the segwit xpub of each of the first 7 accounts has history
    let used: Vec<String> = (0..7)
        .map(|i| deriver.derive(i).unwrap().unwrap()[1].clone())
        .collect();
    let source = Arc::new(SetUsageSource::new(used));
    let discovery = AccountDiscovery::new(source.clone());

    let count = discovery.discover_accounts(3, &deriver).await.unwrap();
    assert_eq!(count, 7);
    // 0-2 full, 3-5 full, 6-8 partial
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_address_discovery_below_xpub() {
    init_logger();
    let params = ChainParams::bitcoin_cash(Network::Bitcoin);
    let accounts = AccountXpubDeriver::for_chain(test_master(Network::Bitcoin), &params);
    let xpub = Xpub::from_str(&accounts.derive(0).unwrap().unwrap()[0]).unwrap();
    let deriver = AddressDeriver::new(xpub, Purpose::Legacy, params);

    let used: Vec<String> = (0..12).map(|i| deriver.derive(i).unwrap().unwrap()).collect();
    assert!(used.iter().all(|a| a.starts_with("bitcoincash:q")));

    let discovery = AccountDiscovery::new(Arc::new(SetUsageSource::new(used)));
    let count = discovery.discover_addresses(5, &deriver).await.unwrap();
    assert_eq!(count, 12);
}

// ============================================================================
// 3-4. Bitcoin Cash spend with replay protection
// ============================================================================

#[tokio::test]
async fn test_bch_spend_end_to_end() {
    init_logger();
    let params = ChainParams::bitcoin_cash(Network::Bitcoin);
    let master = test_master(Network::Bitcoin);

    // The signing key for m/44'/145'/0'/0/0 must pay to the address the
    // watch-only deriver shows for the same index
    let key = derive_signing_key(&master, &receive_path(Purpose::Legacy, 145, 0, 0)).unwrap();
    let pubkey = public_key(&key);
    let accounts = AccountXpubDeriver::for_chain(master, &params);
    let xpub = Xpub::from_str(&accounts.derive(0).unwrap().unwrap()[0]).unwrap();
    let receive = AddressDeriver::new(xpub, Purpose::Legacy, params.clone());
    let own_address = receive.derive(0).unwrap().unwrap();
    let change_address = receive.derive(1).unwrap().unwrap();
    assert_eq!(
        own_address,
        hdspend_core::address::p2pkh_address(&params, &pubkey)
    );

    let candidate = SigningCandidate {
        spendable_outputs: vec![UnspentOutput {
            transaction_hash: Txid::from_byte_array([0x42; 32]),
            output_index: 0,
            value: Amount::from_sat(100_000),
            locking_script: ScriptBuf::new_p2pkh(&pubkey.pubkey_hash()),
        }],
        amount: Amount::from_sat(90_000),
        change: Amount::from_sat(9_000),
        private_keys: vec![key],
        // Prefix-less CashAddr is accepted
        destination_address: "qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a".into(),
        change_address,
    };

    let orchestrator =
        SigningOrchestrator::for_chain(params, Some(Arc::new(FixedDustSource(dust()))));
    let output = orchestrator.sign(candidate).await.expect("signing");

    let tx: Transaction = deserialize(&output.serialized_transaction).expect("round trip");
    assert_eq!(tx.version.0, 2);
    assert_eq!(tx.input.len(), 2);
    assert_eq!(tx.output.len(), 3);
    let values: Vec<u64> = tx.output.iter().map(|o| o.value.to_sat()).collect();
    assert_eq!(values, vec![90_000, 9_000, 546]);
    assert_eq!(tx.input[1].previous_output, dust().bound_output.outpoint());
    assert!(tx.input[1].script_sig.is_empty());

    assert_eq!(output.transaction_hash, tx.compute_txid().to_string());
    assert_eq!(output.replay_protection_unlock_secret.as_deref(), Some("5ec12e7"));

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["transaction_hash"], output.transaction_hash);
    println!("✓ Signed BCH transaction {}", output.transaction_hash);
}

#[tokio::test]
async fn test_bch_spend_dust_service_down() {
    init_logger();
    let params = ChainParams::bitcoin_cash(Network::Bitcoin);
    let master = test_master(Network::Bitcoin);
    let key = derive_signing_key(&master, &receive_path(Purpose::Legacy, 145, 0, 0)).unwrap();
    let pubkey = public_key(&key);
    let address = hdspend_core::address::p2pkh_address(&params, &pubkey);

    let candidate = SigningCandidate {
        spendable_outputs: vec![UnspentOutput {
            transaction_hash: Txid::from_byte_array([0x43; 32]),
            output_index: 0,
            value: Amount::from_sat(20_000),
            locking_script: ScriptBuf::new_p2pkh(&pubkey.pubkey_hash()),
        }],
        amount: Amount::from_sat(19_000),
        change: Amount::ZERO,
        private_keys: vec![key],
        destination_address: address.clone(),
        change_address: address,
    };

    let orchestrator = SigningOrchestrator::for_chain(params, Some(Arc::new(DownDustSource)));
    let err = orchestrator.sign(candidate).await.unwrap_err();
    assert!(matches!(
        err,
        SigningError::ReplayProtection(NetworkError::Transport(_))
    ));
}

// ============================================================================
// 5. Bitcoin segwit spend
// ============================================================================

#[tokio::test]
async fn test_btc_segwit_spend_end_to_end() {
    init_logger();
    let params = ChainParams::bitcoin(Network::Bitcoin);
    let master = test_master(Network::Bitcoin);

    let keys: Vec<PrivateKeyBytes> = (0..2)
        .map(|i| derive_signing_key(&master, &receive_path(Purpose::Segwit, 0, 0, i)).unwrap())
        .collect();
    let outputs: Vec<UnspentOutput> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| UnspentOutput {
            transaction_hash: Txid::from_byte_array([i as u8 + 1; 32]),
            output_index: i as u32,
            value: Amount::from_sat(30_000),
            locking_script: ScriptBuf::new_p2wpkh(&public_key(key).wpubkey_hash()),
        })
        .collect();

    // First BIP84 receive address of the test mnemonic
    let first = hdspend_core::address::p2wpkh_address(&params, &public_key(&keys[0])).unwrap();
    assert_eq!(first, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");

    let candidate = SigningCandidate {
        spendable_outputs: outputs,
        amount: Amount::from_sat(50_000),
        change: Amount::from_sat(9_500),
        private_keys: keys,
        destination_address: "1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu".into(),
        change_address: first,
    };

    // Bitcoin never asks for replay protection, even when a source is wired
    let orchestrator =
        SigningOrchestrator::for_chain(params, Some(Arc::new(FixedDustSource(dust()))));
    let output = orchestrator.sign(candidate).await.expect("signing");

    let tx: Transaction = deserialize(&output.serialized_transaction).unwrap();
    assert_eq!(tx.input.len(), 2);
    assert!(tx.input.iter().all(|i| i.witness.len() == 2));
    assert!(tx.input.iter().all(|i| i.script_sig.is_empty()));
    assert_eq!(tx.output.len(), 2);
    assert_eq!(output.replay_protection_unlock_secret, None);
    // txid excludes the witness
    assert_eq!(output.transaction_hash, tx.compute_txid().to_string());
    assert_ne!(output.transaction_hash, tx.compute_wtxid().to_string());
}
