//! Authenticated envelope using `XChaCha20-Poly1305`
//!
//! The AEAD key is expanded from the conversation passphrase with
//! HKDF-SHA256. The caller supplies a fresh 24-byte nonce per field, so equal
//! plaintexts do not produce equal ciphertexts.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::OpenFailure;

/// Size of the `XChaCha20` nonce (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Marker distinguishing sealed fields from OpenSSL envelopes
pub(crate) const PREFIX: &str = "v2:";

/// Poly1305 tag size (16 bytes)
const POLY1305_TAG_SIZE: usize = 16;

/// Label used for field key derivation
const FIELD_KEY_LABEL: &[u8] = b"parleySealedFieldV1";

/// Encrypt and serialize as `v2:` + base64(nonce || ciphertext).
pub(crate) fn seal(plaintext: &[u8], passphrase: &[u8], nonce: [u8; NONCE_SIZE]) -> String {
    let mut key = field_key(passphrase);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    let mut raw = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    raw.extend_from_slice(&nonce);
    raw.extend_from_slice(&ciphertext);

    format!("{PREFIX}{}", STANDARD.encode(raw))
}

/// Parse and decrypt.
///
/// # Errors
///
/// - `Malformed`: missing prefix, not base64, shorter than nonce plus tag
/// - `Rejected`: authentication failed (wrong key or tampering)
pub(crate) fn open(encoded: &str, passphrase: &[u8]) -> Result<Vec<u8>, OpenFailure> {
    let body = encoded.strip_prefix(PREFIX).ok_or(OpenFailure::Malformed("missing sealed prefix"))?;
    let raw = STANDARD.decode(body).map_err(|_| OpenFailure::Malformed("not base64"))?;

    if raw.len() < NONCE_SIZE + POLY1305_TAG_SIZE {
        return Err(OpenFailure::Malformed("truncated sealed field"));
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);

    let mut key = field_key(passphrase);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| OpenFailure::Rejected("authentication failed"))
}

/// Expand the conversation passphrase into a 32-byte AEAD key.
fn field_key(passphrase: &[u8]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(None, passphrase);

    let mut key = [0u8; 32];
    let Ok(()) = hkdf.expand(FIELD_KEY_LABEL, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &[u8] = b"611b6e0ab188c1b2b6ed16d9da695f5729488576753492d068ecbdfe282db569";
    const OTHER: &[u8] = b"b53cc518c9ec343e60677a40603f3babab0f79fd65265825df961556dab2c5ec";

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(b"Hello, World!", PASSPHRASE, [0xAB; NONCE_SIZE]);
        assert!(sealed.starts_with(PREFIX));
        assert_eq!(open(&sealed, PASSPHRASE).unwrap(), b"Hello, World!");
    }

    #[test]
    fn ciphertext_carries_nonce_and_tag() {
        let plaintext = b"test message";
        let sealed = seal(plaintext, PASSPHRASE, [0; NONCE_SIZE]);
        let raw = STANDARD.decode(&sealed[PREFIX.len()..]).unwrap();
        assert_eq!(raw.len(), NONCE_SIZE + plaintext.len() + POLY1305_TAG_SIZE);
    }

    #[test]
    fn different_nonces_produce_different_ciphertexts() {
        let a = seal(b"same", PASSPHRASE, [0x00; NONCE_SIZE]);
        let b = seal(b"same", PASSPHRASE, [0xFF; NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = seal(b"secret", PASSPHRASE, [1; NONCE_SIZE]);
        assert_eq!(open(&sealed, OTHER), Err(OpenFailure::Rejected("authentication failed")));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let sealed = seal(b"original message", PASSPHRASE, [3; NONCE_SIZE]);
        let mut raw = STANDARD.decode(&sealed[PREFIX.len()..]).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = format!("{PREFIX}{}", STANDARD.encode(raw));

        assert_eq!(open(&tampered, PASSPHRASE), Err(OpenFailure::Rejected("authentication failed")));
    }

    #[test]
    fn truncated_field_is_malformed() {
        let short = format!("{PREFIX}{}", STANDARD.encode([0u8; NONCE_SIZE]));
        assert_eq!(open(&short, PASSPHRASE), Err(OpenFailure::Malformed("truncated sealed field")));
    }

    #[test]
    fn bad_base64_is_malformed() {
        assert_eq!(open("v2:not base64!", PASSPHRASE), Err(OpenFailure::Malformed("not base64")));
    }

    #[test]
    fn missing_prefix_is_malformed() {
        assert_eq!(open("AAAA", PASSPHRASE), Err(OpenFailure::Malformed("missing sealed prefix")));
    }

    #[test]
    fn field_key_is_deterministic() {
        assert_eq!(field_key(PASSPHRASE), field_key(PASSPHRASE));
        assert_ne!(field_key(PASSPHRASE), field_key(OTHER));
    }
}
