//! Message store abstraction
//!
//! The external document store that holds conversations. The trait is
//! synchronous; hosts with an async backend wrap it at their own boundary.

mod chaotic;
mod error;
mod memory;

pub use chaotic::ChaoticStore;
use chrono::{DateTime, Utc};
pub use error::StoreError;
pub use memory::MemoryStore;
use parley_crypto::ConversationId;

use crate::message::{Message, MessageId};

/// Storage for message records, keyed by conversation.
///
/// Must be Clone (shared by several messengers), Send + Sync (thread-safe),
/// and synchronous. Implementations typically share internal state via Arc,
/// so clones access the same underlying store.
///
/// # Panics
///
/// Implementations may panic if internal synchronization primitives are
/// poisoned. Acceptable for test/simulation code, but production
/// implementations should handle poisoned mutexes gracefully.
pub trait MessageStore: Clone + Send + Sync + 'static {
    /// Append a message to a conversation and assign its id.
    ///
    /// Any `id` already set on `message` is ignored.
    ///
    /// # Invariants
    ///
    /// - Post: the returned id is unique within the store
    /// - Post: the record is visible to `load` and `list`
    fn append(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<MessageId, StoreError>;

    /// Load a single message.
    ///
    /// Returns `None` if the conversation has no message with that id.
    fn load(
        &self,
        conversation: &ConversationId,
        id: &MessageId,
    ) -> Result<Option<Message>, StoreError>;

    /// All messages of a conversation, oldest first.
    ///
    /// Ordered by timestamp; messages with equal timestamps keep insertion
    /// order. Empty if the conversation does not exist.
    fn list(&self, conversation: &ConversationId) -> Result<Vec<Message>, StoreError>;

    /// Overwrite a stored message.
    ///
    /// # Errors
    ///
    /// - `MissingId` if `message.id` is `None`
    /// - `NotFound` if no message with that id exists in the conversation
    fn update(&self, conversation: &ConversationId, message: &Message) -> Result<(), StoreError>;

    /// Timestamp of the newest message. `None` if no messages stored.
    fn latest_timestamp(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;
}
