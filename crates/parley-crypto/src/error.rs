//! Error types for conversation cipher operations

use std::fmt;

use thiserror::Error;

use crate::envelope::Decryption;

/// Which side of a participant pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Participant {
    /// The first identifier passed by the caller.
    First,
    /// The second identifier passed by the caller.
    Second,
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Second => f.write_str("second"),
        }
    }
}

/// Errors from conversation cipher operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// A participant identifier was empty or whitespace-only.
    ///
    /// No key is derived in this case; producing one would leave the
    /// conversation permanently undecryptable.
    #[error("invalid participant identifier: {position} participant is empty")]
    InvalidParticipant {
        /// Which identifier was rejected
        position: Participant,
    },

    /// A field could not be opened under the source pair while re-encrypting.
    #[error("source field could not be decrypted: {outcome}")]
    Undecryptable {
        /// The sentinel outcome of the failed decryption
        outcome: Decryption,
    },
}

impl CipherError {
    /// Returns true if the caller passed bad input.
    ///
    /// Input errors are programming errors at the call site. An
    /// [`CipherError::Undecryptable`] source is a data problem with the
    /// stored record.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidParticipant { .. })
    }
}
