//! Error types for messenger operations

use parley_crypto::CipherError;
use thiserror::Error;

use crate::{message::MessageId, store::StoreError};

/// Errors from messenger operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Participant identifiers or an undecryptable forward source
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Message store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Message body is empty or whitespace-only
    #[error("message body is empty")]
    EmptyMessage,

    /// No message with this id in the conversation
    #[error("message not found: {id}")]
    MessageNotFound {
        /// The id that was looked up
        id: MessageId,
    },

    /// Only the author may edit or delete a message
    #[error("message {id} was not written by {user_id}")]
    NotAuthor {
        /// Target message
        id: MessageId,
        /// User attempting the change
        user_id: String,
    },

    /// Message cannot be edited (deleted, or not a text message)
    #[error("message {id} cannot be edited")]
    NotEditable {
        /// Target message
        id: MessageId,
    },

    /// Attachment exceeds the upload limit
    #[error("attachment is {size} bytes, limit is {max}")]
    FileTooLarge {
        /// Attachment size in bytes
        size: u64,
        /// Upload limit in bytes
        max: u64,
    },

    /// Message is deleted or its sender disabled forwarding
    #[error("message {id} cannot be forwarded")]
    ForwardNotAllowed {
        /// Target message
        id: MessageId,
    },

    /// Reply references a message missing from the conversation
    #[error("reply target not found: {id}")]
    ReplyTargetNotFound {
        /// The referenced id
        id: MessageId,
    },

    /// Configuration could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns true if retrying the same operation may succeed
    ///
    /// Only store outages are transient. Everything else is a caller error
    /// or a property of the stored data and fails the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(error) => error.is_transient(),

            Self::Cipher(_)
            | Self::EmptyMessage
            | Self::MessageNotFound { .. }
            | Self::NotAuthor { .. }
            | Self::NotEditable { .. }
            | Self::FileTooLarge { .. }
            | Self::ForwardNotAllowed { .. }
            | Self::ReplyTargetNotFound { .. }
            | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_crypto::Participant;

    use super::*;

    #[test]
    fn store_outage_is_transient() {
        let error: ClientError = StoreError::Unavailable { reason: "offline".to_string() }.into();
        assert!(error.is_transient());
    }

    #[test]
    fn caller_errors_are_not_transient() {
        let id = MessageId::new("m1");

        assert!(!ClientError::EmptyMessage.is_transient());
        assert!(!ClientError::NotEditable { id: id.clone() }.is_transient());
        assert!(!ClientError::ForwardNotAllowed { id }.is_transient());
        assert!(!ClientError::from(StoreError::MissingId).is_transient());
    }

    #[test]
    fn cipher_error_message_is_preserved() {
        let error: ClientError =
            CipherError::InvalidParticipant { position: Participant::Second }.into();

        assert_eq!(
            error.to_string(),
            "invalid participant identifier: second participant is empty"
        );
        assert!(!error.is_transient());
    }

    #[test]
    fn not_author_names_user() {
        let error = ClientError::NotAuthor { id: MessageId::new("m7"), user_id: "bob".to_string() };
        assert_eq!(error.to_string(), "message m7 was not written by bob");
    }
}
