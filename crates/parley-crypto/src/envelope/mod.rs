//! Envelope formats for encrypted message fields
//!
//! An envelope is the single string stored in place of a plaintext field.
//! Two formats exist and [`open`] recognises both from the string itself:
//!
//! - [`EnvelopeFormat::OpenSsl`]: `base64("Salted__" || salt || AES-256-CBC)`,
//!   key and IV from `EVP_BytesToKey`. Byte-compatible with the browser
//!   client's stored records.
//! - [`EnvelopeFormat::Sealed`]: `"v2:" || base64(nonce || XChaCha20-Poly1305)`.
//!
//! Opening never fails past this module. Every problem is folded into a
//! [`Decryption`] sentinel so a message list can always render.

mod openssl;
mod sealed;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::{openssl::SALT_SIZE, sealed::NONCE_SIZE};
use crate::key::ConversationKey;

/// Sentinel shown when the cipher ran but produced nothing usable.
///
/// Almost always a key mismatch: the field belongs to another conversation or
/// was forwarded without re-encryption.
pub const EMPTY_SENTINEL: &str = "[Decryption Error]";

/// Sentinel shown when the stored string is not an envelope at all.
///
/// Typical for legacy plaintext written before encryption was introduced.
pub const FAILED_SENTINEL: &str = "[Message could not be decrypted]";

/// Envelope format used when writing new fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// Salted AES-256-CBC, readable by the browser client.
    #[default]
    OpenSsl,
    /// Authenticated XChaCha20-Poly1305 with a random nonce.
    Sealed,
}

impl EnvelopeFormat {
    /// Build the sealing parameters for this format from caller randomness.
    ///
    /// The OpenSSL format uses the first [`SALT_SIZE`] bytes as its salt.
    pub fn seal_from(self, random: [u8; NONCE_SIZE]) -> Seal {
        match self {
            Self::OpenSsl => {
                let mut salt = [0u8; SALT_SIZE];
                salt.copy_from_slice(&random[..SALT_SIZE]);
                Seal::OpenSsl { salt }
            },
            Self::Sealed => Seal::Sealed { nonce: random },
        }
    }

    /// Format a stored string claims to be in.
    pub fn detect(ciphertext: &str) -> Self {
        if ciphertext.starts_with(sealed::PREFIX) { Self::Sealed } else { Self::OpenSsl }
    }
}

impl fmt::Display for EnvelopeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenSsl => f.write_str("openssl"),
            Self::Sealed => f.write_str("sealed"),
        }
    }
}

/// Format plus the random bytes one encryption consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seal {
    /// OpenSSL envelope with an 8-byte salt.
    OpenSsl {
        /// Salt fed to `EVP_BytesToKey`
        salt: [u8; SALT_SIZE],
    },
    /// Sealed envelope with a 24-byte nonce.
    Sealed {
        /// `XChaCha20` nonce
        nonce: [u8; NONCE_SIZE],
    },
}

impl Seal {
    /// The envelope format these parameters produce.
    pub fn format(&self) -> EnvelopeFormat {
        match self {
            Self::OpenSsl { .. } => EnvelopeFormat::OpenSsl,
            Self::Sealed { .. } => EnvelopeFormat::Sealed,
        }
    }
}

/// Outcome of opening an envelope.
///
/// Always renderable through [`Decryption::as_str`]. The two sentinel cases
/// stay distinct so logs and UIs can tell a key mismatch from a malformed
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decryption {
    /// The recovered plaintext.
    Plaintext(String),
    /// The cipher ran but yielded empty or invalid plaintext.
    Empty,
    /// The input could not be parsed as an envelope.
    Failed,
}

impl Decryption {
    /// Display text: the plaintext, or the matching sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plaintext(text) => text,
            Self::Empty => EMPTY_SENTINEL,
            Self::Failed => FAILED_SENTINEL,
        }
    }

    /// True if the plaintext was recovered.
    pub fn is_plaintext(&self) -> bool {
        matches!(self, Self::Plaintext(_))
    }

    /// Recovered plaintext, if any.
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            Self::Plaintext(text) => Some(text),
            Self::Empty | Self::Failed => None,
        }
    }

    /// Consume into the recovered plaintext, if any.
    pub fn into_plaintext(self) -> Option<String> {
        match self {
            Self::Plaintext(text) => Some(text),
            Self::Empty | Self::Failed => None,
        }
    }
}

impl fmt::Display for Decryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an envelope did not open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenFailure {
    /// Not an envelope of the detected format.
    Malformed(&'static str),
    /// Well-formed, but the key did not fit.
    Rejected(&'static str),
}

/// Encrypt a field under a conversation key.
pub fn seal(key: &ConversationKey, plaintext: &str, seal: Seal) -> String {
    match seal {
        Seal::OpenSsl { salt } => openssl::seal(plaintext.as_bytes(), key.passphrase(), salt),
        Seal::Sealed { nonce } => sealed::seal(plaintext.as_bytes(), key.passphrase(), nonce),
    }
}

/// Decrypt a field under a conversation key.
///
/// Never fails. Problems are logged at `warn` and returned as sentinels.
pub fn open(key: &ConversationKey, ciphertext: &str) -> Decryption {
    if ciphertext.is_empty() {
        tracing::warn!("decryption of empty field");
        return Decryption::Empty;
    }

    let format = EnvelopeFormat::detect(ciphertext);
    let opened = match format {
        EnvelopeFormat::OpenSsl => openssl::open(ciphertext, key.passphrase()),
        EnvelopeFormat::Sealed => sealed::open(ciphertext, key.passphrase()),
    };

    match opened {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) if !text.is_empty() => Decryption::Plaintext(text),
            Ok(_) => {
                tracing::warn!(%format, "decryption produced empty plaintext, key is likely wrong");
                Decryption::Empty
            },
            Err(_) => {
                tracing::warn!(%format, "decryption produced invalid UTF-8, key is likely wrong");
                Decryption::Empty
            },
        },
        Err(OpenFailure::Rejected(reason)) => {
            tracing::warn!(%format, reason, "decryption rejected, key is likely wrong");
            Decryption::Empty
        },
        Err(OpenFailure::Malformed(reason)) => {
            tracing::warn!(%format, reason, "field is not a valid envelope");
            Decryption::Failed
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_key;

    #[test]
    fn seal_from_truncates_to_salt() {
        let random: [u8; NONCE_SIZE] = core::array::from_fn(|i| i as u8);
        let seal = EnvelopeFormat::OpenSsl.seal_from(random);
        assert_eq!(seal, Seal::OpenSsl { salt: [0, 1, 2, 3, 4, 5, 6, 7] });
        assert_eq!(seal.format(), EnvelopeFormat::OpenSsl);
    }

    #[test]
    fn seal_from_keeps_full_nonce() {
        let random = [0x5A; NONCE_SIZE];
        let seal = EnvelopeFormat::Sealed.seal_from(random);
        assert_eq!(seal, Seal::Sealed { nonce: random });
        assert_eq!(seal.format(), EnvelopeFormat::Sealed);
    }

    #[test]
    fn detect_by_prefix() {
        assert_eq!(EnvelopeFormat::detect("v2:AAAA"), EnvelopeFormat::Sealed);
        assert_eq!(EnvelopeFormat::detect("U2FsdGVkX1"), EnvelopeFormat::OpenSsl);
        assert_eq!(EnvelopeFormat::detect("hello"), EnvelopeFormat::OpenSsl);
    }

    #[test]
    fn format_serde_names() {
        assert_eq!(serde_json::to_string(&EnvelopeFormat::OpenSsl).unwrap(), "\"openssl\"");
        let parsed: EnvelopeFormat = serde_json::from_str("\"sealed\"").unwrap();
        assert_eq!(parsed, EnvelopeFormat::Sealed);
    }

    #[test]
    fn both_formats_open() {
        let key = derive_key("alice", "bob").unwrap();

        for seal_params in [Seal::OpenSsl { salt: [1; SALT_SIZE] }, Seal::Sealed { nonce: [2; NONCE_SIZE] }]
        {
            let ciphertext = seal(&key, "hi there", seal_params);
            assert_eq!(open(&key, &ciphertext), Decryption::Plaintext("hi there".to_string()));
        }
    }

    #[test]
    fn empty_field_is_empty_sentinel() {
        let key = derive_key("alice", "bob").unwrap();
        assert_eq!(open(&key, ""), Decryption::Empty);
    }

    #[test]
    fn legacy_plaintext_is_failed_sentinel() {
        let key = derive_key("alice", "bob").unwrap();
        assert_eq!(open(&key, "hello from before encryption"), Decryption::Failed);
    }

    #[test]
    fn encrypted_empty_string_is_empty_sentinel() {
        let key = derive_key("alice", "bob").unwrap();
        let ciphertext = seal(&key, "", Seal::OpenSsl { salt: [0; SALT_SIZE] });
        assert_eq!(open(&key, &ciphertext), Decryption::Empty);
    }

    #[test]
    fn sentinels_are_distinct() {
        assert_ne!(Decryption::Empty.as_str(), Decryption::Failed.as_str());
        assert_eq!(Decryption::Empty.to_string(), EMPTY_SENTINEL);
        assert_eq!(Decryption::Failed.to_string(), FAILED_SENTINEL);
    }

    #[test]
    fn plaintext_accessors() {
        let ok = Decryption::Plaintext("x".to_string());
        assert!(ok.is_plaintext());
        assert_eq!(ok.plaintext(), Some("x"));
        assert_eq!(ok.into_plaintext(), Some("x".to_string()));

        assert!(!Decryption::Empty.is_plaintext());
        assert_eq!(Decryption::Failed.plaintext(), None);
        assert_eq!(Decryption::Empty.into_plaintext(), None);
    }
}
