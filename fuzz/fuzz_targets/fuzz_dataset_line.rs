//! Fuzz target for dataset line parsing.

#![no_main]

use gm_core::dataset::parse_record;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(record) = parse_record(text, 1) {
            assert_eq!(record.line, 1);
        }
    }
});
