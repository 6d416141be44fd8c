//! Field encryption keyed by participant pair
//!
//! Every call derives the conversation key afresh from its arguments. There
//! is no cache and no shared state, so calls are independent and safe to run
//! in parallel.

use crate::{
    envelope::{self, Decryption, Seal},
    error::CipherError,
    key::derive_key,
};

/// Text stored in place of a deleted message's content.
pub const DELETED_PLACEHOLDER: &str = "This message was deleted.";

/// Encrypt a field for the conversation between two participants.
///
/// # Errors
///
/// - `InvalidParticipant` if either identifier is empty after trimming
pub fn encrypt(
    plaintext: &str,
    participant_a: &str,
    participant_b: &str,
    seal: Seal,
) -> Result<String, CipherError> {
    let key = derive_key(participant_a, participant_b)?;
    tracing::debug!(format = %seal.format(), len = plaintext.len(), "encrypting field");
    Ok(envelope::seal(&key, plaintext, seal))
}

/// Decrypt a field for the conversation between two participants.
///
/// Ciphertext problems never surface as errors: the result is a
/// [`Decryption`] that always renders.
///
/// # Errors
///
/// - `InvalidParticipant` if either identifier is empty after trimming
pub fn decrypt(
    ciphertext: &str,
    participant_a: &str,
    participant_b: &str,
) -> Result<Decryption, CipherError> {
    let key = derive_key(participant_a, participant_b)?;
    Ok(envelope::open(&key, ciphertext))
}

/// Move a field from one conversation to another.
///
/// Decrypts under the `from` pair, then encrypts the plaintext under the `to`
/// pair. Both pairs are validated before any decryption happens.
///
/// # Errors
///
/// - `InvalidParticipant` if any identifier is empty after trimming
/// - `Undecryptable` if the field does not open under the `from` pair; no
///   sentinel text is ever re-encrypted
pub fn reencrypt(
    ciphertext: &str,
    from: (&str, &str),
    to: (&str, &str),
    seal: Seal,
) -> Result<String, CipherError> {
    let source = derive_key(from.0, from.1)?;
    let target = derive_key(to.0, to.1)?;

    match envelope::open(&source, ciphertext) {
        Decryption::Plaintext(text) => Ok(envelope::seal(&target, &text, seal)),
        outcome => Err(CipherError::Undecryptable { outcome }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        envelope::{NONCE_SIZE, SALT_SIZE},
        error::Participant,
    };

    const OPENSSL: Seal = Seal::OpenSsl { salt: [9; SALT_SIZE] };
    const SEALED: Seal = Seal::Sealed { nonce: [7; NONCE_SIZE] };

    #[test]
    fn encrypt_decrypt_roundtrip() {
        for seal in [OPENSSL, SEALED] {
            let ciphertext = encrypt("Hello", "alice", "bob", seal).unwrap();
            let decrypted = decrypt(&ciphertext, "alice", "bob").unwrap();
            assert_eq!(decrypted, Decryption::Plaintext("Hello".to_string()));
        }
    }

    #[test]
    fn decrypt_with_reversed_pair() {
        let ciphertext = encrypt("Hello", "alice", "bob", OPENSSL).unwrap();
        let decrypted = decrypt(&ciphertext, "bob", "alice").unwrap();
        assert_eq!(decrypted.as_str(), "Hello");
    }

    #[test]
    fn decrypt_browser_client_record() {
        let decrypted = decrypt("U2FsdGVkX18BAgMEBQYHCKDykrQd4KdJVwokg4TsRT4=", "bob", "alice");
        assert_eq!(decrypted.unwrap().as_str(), "Hello");
    }

    #[test]
    fn other_pair_gets_empty_sentinel() {
        let ciphertext = encrypt("Hello", "alice", "bob", OPENSSL).unwrap();
        let decrypted = decrypt(&ciphertext, "alice", "carol").unwrap();
        assert_eq!(decrypted, Decryption::Empty);
    }

    #[test]
    fn encrypt_rejects_invalid_participant() {
        let result = encrypt("Hello", " ", "bob", OPENSSL);
        assert_eq!(
            result.unwrap_err(),
            CipherError::InvalidParticipant { position: Participant::First }
        );
    }

    #[test]
    fn decrypt_rejects_invalid_participant() {
        let result = decrypt("U2FsdGVkX1", "alice", "");
        assert_eq!(
            result.unwrap_err(),
            CipherError::InvalidParticipant { position: Participant::Second }
        );
    }

    #[test]
    fn reencrypt_moves_field_between_pairs() {
        let original = encrypt("Hello", "alice", "bob", OPENSSL).unwrap();
        let forwarded = reencrypt(&original, ("alice", "bob"), ("alice", "carol"), SEALED).unwrap();

        assert_eq!(decrypt(&forwarded, "alice", "carol").unwrap().as_str(), "Hello");
        assert!(!decrypt(&forwarded, "alice", "bob").unwrap().is_plaintext());
    }

    #[test]
    fn reencrypt_refuses_undecryptable_source() {
        let foreign = encrypt("Hello", "dave", "erin", OPENSSL).unwrap();
        let result = reencrypt(&foreign, ("alice", "bob"), ("alice", "carol"), OPENSSL);
        assert_eq!(result.unwrap_err(), CipherError::Undecryptable { outcome: Decryption::Empty });
    }

    #[test]
    fn reencrypt_refuses_legacy_plaintext() {
        let result = reencrypt("plain old text", ("alice", "bob"), ("alice", "carol"), OPENSSL);
        assert_eq!(result.unwrap_err(), CipherError::Undecryptable { outcome: Decryption::Failed });
    }

    #[test]
    fn reencrypt_validates_target_pair() {
        let original = encrypt("Hello", "alice", "bob", OPENSSL).unwrap();
        let result = reencrypt(&original, ("alice", "bob"), ("alice", "  "), OPENSSL);
        assert!(result.unwrap_err().is_input_error());
    }

    #[test]
    fn deleted_placeholder_roundtrip() {
        let tombstone = encrypt(DELETED_PLACEHOLDER, "alice", "bob", OPENSSL).unwrap();
        assert_eq!(
            decrypt(&tombstone, "alice", "bob").unwrap().as_str(),
            "This message was deleted."
        );
    }
}
