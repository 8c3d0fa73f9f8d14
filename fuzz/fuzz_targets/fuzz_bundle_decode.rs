#![no_main]

use formwarden::config::Validator;
use formwarden::config::loader::decode_bundle;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(encoded) = std::str::from_utf8(data) {
        // Decoding and validating must never panic on hostile input
        if let Ok(config) = decode_bundle(encoded) {
            let _ = Validator::new().validate_session(&config);
        }
    }
});
