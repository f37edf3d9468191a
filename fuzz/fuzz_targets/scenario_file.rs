#![no_main]

use std::path::Path;

use dapcheck::harness::scenario::parse_scenarios;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Scenario files must be rejected with an error, never a panic
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(scenarios) = parse_scenarios(s, Path::new("fuzz.toml"), Path::new("/fuzz")) {
            for scenario in &scenarios {
                assert!(scenario.validate().is_ok());
            }
        }
    }
});
