#![no_main]

use applock_core::{InputSession, PasscodeType, SessionState};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Key {
    Char(char),
    Delete,
    Submit,
}

#[derive(Debug, Arbitrary)]
struct Input {
    digits: Option<u8>,
    alphanumeric: bool,
    keys: Vec<Key>,
}

fuzz_target!(|input: Input| {
    let kind = match (input.digits, input.alphanumeric) {
        (Some(digits), _) => match PasscodeType::numeric(u32::from(digits)) {
            Ok(kind) => kind,
            Err(_) => return,
        },
        (None, true) => PasscodeType::Alphanumeric,
        (None, false) => PasscodeType::CustomNumeric,
    };

    // Without a runtime rejected input is cleared immediately
    let session = InputSession::new(kind, |code| code == "0000");

    for key in input.keys {
        match key {
            Key::Char(c) => {
                session.append(c);
            }
            Key::Delete => session.delete_last(),
            Key::Submit => {
                session.submit();
            }
        }

        if let Some(max) = kind.max_input_length() {
            assert!(session.input_len() <= max);
        }
        if matches!(session.state(), SessionState::Completed(_)) {
            assert_eq!(session.input_len(), 0);
        }
    }
});
