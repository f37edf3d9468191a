#![no_main]

use dapcheck_core::commands;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // Whatever parses must re-parse to the same command from its canonical spelling
        if let Some((id, args)) = commands::parse_line(line) {
            let canonical = format!("{} {}", commands::as_str(id), args.join(" "));
            let reparsed = commands::parse_line(&canonical).map(|(id, _)| id);
            assert_eq!(reparsed, Some(id));
        }
    }
});
