//! Live Integration Tests: Wallet API & Electrum
//!
//! These tests make REAL network calls. No mocks.
//! Run with: cargo test -p hdspend-e2e --test live_integration -- --ignored --nocapture
//!
//! Test wallet:
//!   Mnemonic: abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about
//!   First BIP84 address: bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu (has public history)

use std::sync::Arc;

use bitcoin::Network;
use hdspend_api::{ApiClient, DEFAULT_TIMEOUT};
use hdspend_core::keys::derive_master;
use hdspend_core::seed::{derive_seed, parse_mnemonic};
use hdspend_core::{AccountXpubDeriver, ChainParams};
use hdspend_discovery::{AccountDiscovery, AddressUsageSource, DEFAULT_BATCH_SIZE};
use hdspend_electrum::{default_server, ElectrumClient};
use hdspend_signer::ReplayProtectionSource;

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const TEST_ADDRESS: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
const API_URL: &str = "https://api.blockchain.info";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// TEST 1: Wallet API
// ============================================================================

#[tokio::test]
#[ignore = "requires network access"]
async fn test_api_usage_of_known_address() {
    init_logger();
    let api = ApiClient::new(API_URL, ChainParams::bitcoin(Network::Bitcoin), DEFAULT_TIMEOUT)
        .expect("client");

    let usage = api
        .fetch_usage(&[TEST_ADDRESS.to_string()])
        .await
        .expect("multiaddr");
    let entry = usage
        .iter()
        .find(|a| a.address == TEST_ADDRESS)
        .expect("address in response");
    assert!(entry.transaction_count > 0);
    println!("  ✓ {} has {} transactions", TEST_ADDRESS, entry.transaction_count);
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_api_account_discovery() {
    init_logger();
    let params = ChainParams::bitcoin(Network::Bitcoin);
    let api = ApiClient::new(API_URL, params.clone(), DEFAULT_TIMEOUT).expect("client");

    let seed = derive_seed(&parse_mnemonic(TEST_MNEMONIC).unwrap(), "");
    let master = derive_master(&seed, Network::Bitcoin).unwrap();
    let deriver = AccountXpubDeriver::for_chain(master, &params);

    let discovery = AccountDiscovery::new(Arc::new(api));
    let count = discovery
        .discover_accounts(DEFAULT_BATCH_SIZE, &deriver)
        .await
        .expect("discovery");
    // The well-known test wallet has been used at least once
    assert!(count >= 1);
    println!("  ✓ Discovered {} used accounts", count);
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_api_dust() {
    init_logger();
    let api = ApiClient::new(
        API_URL,
        ChainParams::bitcoin_cash(Network::Bitcoin),
        DEFAULT_TIMEOUT,
    )
    .expect("client");

    match api.fetch_replay_protection().await {
        Ok(params) => {
            assert!(params.amount.to_sat() > 0);
            assert!(!params.unlock_secret.is_empty());
            println!(
                "  ✓ Dust output {}:{}",
                params.bound_output.transaction_hash, params.bound_output.output_index
            );
        }
        Err(e) => println!("  ✗ Dust service unavailable: {}", e),
    }
}

// ============================================================================
// TEST 2: Electrum
// ============================================================================

#[tokio::test]
#[ignore = "requires network access"]
async fn test_electrum_usage_of_known_address() {
    init_logger();
    let params = ChainParams::bitcoin(Network::Bitcoin);
    let client = match ElectrumClient::new(default_server(&params), params) {
        Ok(client) => client,
        Err(e) => {
            println!("  ✗ Failed to connect: {}", e);
            return;
        }
    };

    let usage = client
        .fetch_usage(&[TEST_ADDRESS.to_string()])
        .await
        .expect("history");
    assert_eq!(usage.len(), 1);
    assert!(usage[0].transaction_count > 0);
    assert!(usage[0].total_received.is_none());
    println!("  ✓ Electrum reports {} transactions", usage[0].transaction_count);
}
