//! Parley Conversation Cipher
//!
//! Protects the message fields a direct conversation writes to the shared
//! message store. Pure functions with deterministic outputs; callers provide
//! the random bytes an envelope needs so tests stay reproducible.
//!
//! # Key Lifecycle
//!
//! There is exactly one key per participant pair. It is recomputed on every
//! call from the two identifiers and never cached, persisted, versioned or
//! rotated.
//!
//! ```text
//! {participant A, participant B}
//!        │
//!        ▼ trim, sort, join with '_'
//! ConversationId ("alice_bob")
//!        │
//!        ▼ SHA-256, lowercase hex
//! ConversationKey (64-char passphrase)
//!        │
//!        ├──▶ OpenSSL envelope: EVP_BytesToKey(MD5) → AES-256-CBC
//!        │
//!        └──▶ Sealed envelope:  HKDF-SHA256 → XChaCha20-Poly1305
//! ```
//!
//! # Security
//!
//! The key is derivable by anyone who knows both identifiers, including the
//! operator of the message store. This protects stored fields from casual
//! inspection; it is not end-to-end encryption.
//!
//! - OpenSSL envelope: unauthenticated; wrong keys are detected through
//!   padding and UTF-8 checks only. Readable by the browser client.
//! - Sealed envelope: authenticated, random nonce per field.
//!
//! # Failure Model
//!
//! - Invalid participant identifiers are hard errors ([`CipherError`]); no
//!   key is derived for them.
//! - Ciphertext that cannot be opened is never an error. [`decrypt`] returns
//!   a [`Decryption`] whose sentinel text can always be rendered.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
pub mod envelope;
mod error;
mod key;

pub use cipher::{DELETED_PLACEHOLDER, decrypt, encrypt, reencrypt};
pub use envelope::{
    Decryption, EMPTY_SENTINEL, EnvelopeFormat, FAILED_SENTINEL, NONCE_SIZE, SALT_SIZE, Seal,
};
pub use error::{CipherError, Participant};
pub use key::{ConversationId, ConversationKey, ROOM_ID_DELIMITER, derive_key};
