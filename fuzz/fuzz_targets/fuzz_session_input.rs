#![no_main]

use formwarden::config::Configuration;
use formwarden::session::{SessionBuilder, ViolationKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(session) = SessionBuilder::new(Configuration::new(
        "https://docs.google.com/forms/d/fuzz",
        3,
        None,
        false,
    ))
    .start() else {
        return;
    };

    // Every line is either a known violation or rejected; the count never
    // passes the threshold.
    for line in input.lines() {
        if let Ok(kind) = line.parse::<ViolationKind>() {
            session.record_violation(kind);
        }
    }
    assert!(session.status().violation_count <= 3);
});
