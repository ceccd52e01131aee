#![no_main]

use hdspend_core::CashAddr;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Anything that decodes must re-encode to the same (lowercased) string
        if let Ok(addr) = CashAddr::decode(s) {
            assert_eq!(addr.encode(), s.to_ascii_lowercase());
        }
    }
});
