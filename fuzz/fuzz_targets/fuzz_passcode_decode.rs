#![no_main]

use applock_core::Passcode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Try to decode - should not panic
    if let Ok(passcode) = Passcode::from_bytes(data) {
        // Decoded passcodes are never empty
        assert!(!passcode.matches(""));

        // Encoding a decoded passcode must round-trip
        let encoded = passcode.to_bytes().expect("encode decoded passcode");
        let decoded = Passcode::from_bytes(&encoded).expect("decode re-encoded passcode");
        assert_eq!(passcode, decoded);
    }
});
