//! Conversation key derivation from a participant pair

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{CipherError, Participant};

/// Delimiter joining the sorted participant identifiers into a room id.
///
/// Fixed system-wide. The message store addresses conversations by the same
/// room id, so the store path and the key can never disagree on it.
pub const ROOM_ID_DELIMITER: char = '_';

/// Canonical identifier of a two-party conversation.
///
/// Built from the trimmed participant identifiers in ascending order, joined
/// with [`ROOM_ID_DELIMITER`]. The same pair always yields the same id
/// regardless of argument order.
///
/// Identifiers containing the delimiter can collide: `a_b` + `c` and
/// `a` + `b_c` both map to `a_b_c` and share a key and a store
/// conversation. The delimiter is not escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(String);

impl ConversationId {
    /// Canonicalize a participant pair.
    ///
    /// # Errors
    ///
    /// - `InvalidParticipant` if either identifier is empty after trimming
    pub fn new(participant_a: &str, participant_b: &str) -> Result<Self, CipherError> {
        let a = participant_a.trim();
        let b = participant_b.trim();

        if a.is_empty() {
            return Err(CipherError::InvalidParticipant { position: Participant::First });
        }
        if b.is_empty() {
            return Err(CipherError::InvalidParticipant { position: Participant::Second });
        }

        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self(format!("{low}{ROOM_ID_DELIMITER}{high}")))
    }

    /// The room id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key protecting this conversation's fields.
    pub fn key(&self) -> ConversationKey {
        let digest = Sha256::digest(self.0.as_bytes());
        ConversationKey { passphrase: hex::encode(digest) }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symmetric key for one conversation.
///
/// The lowercase hex SHA-256 digest of the room id. Envelopes use it as a
/// passphrase, not as raw key bytes. Zeroized on drop. Has no
/// `PartialEq`; compare [`ConversationKey::as_hex`] in tests.
#[derive(Clone)]
pub struct ConversationKey {
    passphrase: String,
}

impl ConversationKey {
    /// The 64-character hex passphrase.
    pub fn as_hex(&self) -> &str {
        &self.passphrase
    }

    pub(crate) fn passphrase(&self) -> &[u8] {
        self.passphrase.as_bytes()
    }
}

impl fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConversationKey(..)")
    }
}

impl Drop for ConversationKey {
    fn drop(&mut self) {
        self.passphrase.zeroize();
    }
}

/// Derive the key for the conversation between two participants.
///
/// Symmetric and deterministic: `derive_key(a, b) == derive_key(b, a)`.
///
/// # Errors
///
/// - `InvalidParticipant` if either identifier is empty after trimming
pub fn derive_key(participant_a: &str, participant_b: &str) -> Result<ConversationKey, CipherError> {
    let conversation = ConversationId::new(participant_a, participant_b)?;
    tracing::debug!(%conversation, "derived conversation key");
    Ok(conversation.key())
}
