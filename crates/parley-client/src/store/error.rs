//! Store error types.
//!
//! - `NotFound`: the message to overwrite doesn't exist
//! - `MissingId`: a record without a store-assigned id was written back
//! - `Unavailable`: the backend could not serve the request

use parley_crypto::ConversationId;
use thiserror::Error;

use crate::message::MessageId;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Message not found in the conversation
    #[error("message not found: conversation {conversation}, id {id}")]
    NotFound {
        /// Conversation that was searched
        conversation: ConversationId,
        /// Message id that was not found
        id: MessageId,
    },

    /// Record has no id, so it was never appended
    #[error("message has no store-assigned id")]
    MissingId,

    /// Backend failure (network, quota, injected fault)
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description
        reason: String,
    },
}

impl StoreError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_transient() {
        let conversation = ConversationId::new("alice", "bob").unwrap();

        assert!(StoreError::Unavailable { reason: "timeout".to_string() }.is_transient());
        assert!(!StoreError::MissingId.is_transient());
        assert!(!StoreError::NotFound { conversation, id: MessageId::new("m1") }.is_transient());
    }

    #[test]
    fn not_found_names_conversation_and_id() {
        let conversation = ConversationId::new("bob", "alice").unwrap();
        let error = StoreError::NotFound { conversation, id: MessageId::new("m00000007") };

        assert_eq!(error.to_string(), "message not found: conversation alice_bob, id m00000007");
    }
}
