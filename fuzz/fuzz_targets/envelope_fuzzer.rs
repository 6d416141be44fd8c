//! Fuzz target for envelope parsing and the conversation cipher
//!
//! # Strategy
//!
//! - Arbitrary field strings, including near-valid envelopes built from a
//!   real ciphertext with bytes flipped or cut off
//! - Arbitrary participant identifiers (empty, whitespace, unicode)
//! - Both envelope formats with arbitrary salts and nonces
//!
//! # Invariants
//!
//! - decrypt NEVER panics; it returns a renderable result or an input error
//! - Input errors happen only for blank identifiers
//! - Encrypt/decrypt roundtrip succeeds for valid identifiers
//! - Decryption is repeatable

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_crypto::{decrypt, encrypt, Decryption, EnvelopeFormat, NONCE_SIZE};

#[derive(Debug, Clone, Arbitrary)]
struct EnvelopeScenario {
    participant_a: String,
    participant_b: String,
    plaintext: String,
    sealed: bool,
    random: [u8; NONCE_SIZE],
    attack: Attack,
}

#[derive(Debug, Clone, Arbitrary)]
enum Attack {
    /// Decrypt an arbitrary string
    Raw(String),
    /// Flip one byte of a valid ciphertext
    Flip { index: u16, mask: u8 },
    /// Cut a valid ciphertext short
    Truncate { len: u16 },
    /// Add trailing bytes
    Append(String),
}

fuzz_target!(|scenario: EnvelopeScenario| {
    let a = scenario.participant_a.as_str();
    let b = scenario.participant_b.as_str();
    let valid = !a.trim().is_empty() && !b.trim().is_empty();

    let format = if scenario.sealed { EnvelopeFormat::Sealed } else { EnvelopeFormat::OpenSsl };
    let seal = format.seal_from(scenario.random);

    let ciphertext = match encrypt(&scenario.plaintext, a, b, seal) {
        Ok(ciphertext) => {
            assert!(valid, "encrypt accepted a blank identifier");
            ciphertext
        },
        Err(error) => {
            assert!(!valid, "encrypt rejected valid identifiers: {error}");
            assert!(error.is_input_error());
            assert!(decrypt("anything", a, b).is_err());
            return;
        },
    };

    // Roundtrip
    let opened = decrypt(&ciphertext, a, b).expect("identifiers already validated");
    if scenario.plaintext.is_empty() {
        assert_eq!(opened, Decryption::Empty);
    } else {
        assert_eq!(opened.plaintext(), Some(scenario.plaintext.as_str()));
    }

    let attacked = match scenario.attack {
        Attack::Raw(raw) => raw,
        Attack::Flip { index, mask } => {
            let mut bytes = ciphertext.into_bytes();
            if !bytes.is_empty() {
                let i = usize::from(index) % bytes.len();
                bytes[i] ^= mask;
            }
            String::from_utf8_lossy(&bytes).into_owned()
        },
        Attack::Truncate { len } => {
            let cut = usize::from(len).min(ciphertext.len());
            ciphertext.get(..cut).unwrap_or_default().to_string()
        },
        Attack::Append(tail) => ciphertext + &tail,
    };

    // Never panics, always renders, repeatable
    let first = decrypt(&attacked, a, b).expect("identifiers already validated");
    let second = decrypt(&attacked, a, b).expect("identifiers already validated");
    assert!(!first.as_str().is_empty());
    assert_eq!(first, second);
});
