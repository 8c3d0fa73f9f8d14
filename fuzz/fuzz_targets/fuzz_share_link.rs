#![no_main]

use formwarden::config::loader::parse_link;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(url) = std::str::from_utf8(data) {
        let _ = parse_link(url);
    }
});
