//! Fuzz target for the definition-file record parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_record_parser
//!
//! Feeds arbitrary bytes to `parse_bytes()` and checks that every parsed
//! key and value is trimmed and that keys never contain the separator.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(record) = rolebook_core::parse_bytes(data) else {
        assert!(std::str::from_utf8(data).is_err());
        return;
    };
    for (key, value) in record.iter() {
        assert!(!key.contains(':'));
        assert_eq!(key, key.trim());
        assert_eq!(value, value.trim());
    }
});
