#![no_main]

use libfuzzer_sys::fuzz_target;
use hdspend_core::seed::parse_mnemonic;

fuzz_target!(|data: &[u8]| {
    // parse_mnemonic must never panic; it should always return Ok or Err.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_mnemonic(s);
    }
});
