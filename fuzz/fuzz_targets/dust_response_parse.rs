#![no_main]

use hdspend_api::models::DustResponse;
use hdspend_core::ReplayProtectionParameters;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Server-supplied JSON must decode to parameters or a Decode error, never panic.
    if let Ok(dust) = serde_json::from_slice::<DustResponse>(data) {
        let _ = ReplayProtectionParameters::try_from(dust);
    }
});
