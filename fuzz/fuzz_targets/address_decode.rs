#![no_main]

use bitcoin::Network;
use hdspend_core::{decode_address, ChainParams};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // decode_address must never panic for any chain or network.
    if let Ok(s) = std::str::from_utf8(data) {
        for network in [Network::Bitcoin, Network::Testnet, Network::Regtest] {
            let _ = decode_address(&ChainParams::bitcoin(network), s);
            let _ = decode_address(&ChainParams::bitcoin_cash(network), s);
        }
    }
});
