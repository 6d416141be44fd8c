#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use parley_crypto::ConversationId;

use super::{MessageStore, StoreError};
use crate::message::{Message, MessageId};

/// In-memory store for testing and simulation
///
/// Messages are kept per conversation in insertion order. All state is wrapped
/// in Arc<Mutex<>> so clones share the same conversations. Uses
/// `lock().expect()`, which panics if the mutex is poisoned; acceptable for
/// test code.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

struct MemoryStoreInner {
    /// Messages per conversation, in insertion order
    conversations: HashMap<ConversationId, Vec<Message>>,

    /// Next id to assign, shared across conversations
    next_id: u64,
}

impl MemoryStore {
    /// Create a new empty `MemoryStore`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreInner {
                conversations: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Total number of messages across all conversations.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn message_count(&self) -> usize {
        let inner = self.inner.lock().expect("Mutex poisoned");
        inner.conversations.values().map(Vec::len).sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore for MemoryStore {
    #[allow(clippy::expect_used)]
    fn append(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<MessageId, StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let id = MessageId::new(format!("m{:08}", inner.next_id));
        inner.next_id += 1;

        let mut record = message.clone();
        record.id = Some(id.clone());
        inner.conversations.entry(conversation.clone()).or_default().push(record);

        Ok(id)
    }

    #[allow(clippy::expect_used)]
    fn load(
        &self,
        conversation: &ConversationId,
        id: &MessageId,
    ) -> Result<Option<Message>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner
            .conversations
            .get(conversation)
            .and_then(|messages| messages.iter().find(|m| m.id.as_ref() == Some(id)))
            .cloned())
    }

    #[allow(clippy::expect_used)]
    fn list(&self, conversation: &ConversationId) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let mut messages = inner.conversations.get(conversation).cloned().unwrap_or_default();
        // Stable sort keeps insertion order for equal timestamps
        messages.sort_by_key(|m| m.timestamp);

        Ok(messages)
    }

    #[allow(clippy::expect_used)]
    fn update(&self, conversation: &ConversationId, message: &Message) -> Result<(), StoreError> {
        let id = message.id.as_ref().ok_or(StoreError::MissingId)?;
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let slot = inner
            .conversations
            .get_mut(conversation)
            .and_then(|messages| messages.iter_mut().find(|m| m.id.as_ref() == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                conversation: conversation.clone(),
                id: id.clone(),
            })?;

        *slot = message.clone();
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn latest_timestamp(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner
            .conversations
            .get(conversation)
            .and_then(|messages| messages.iter().map(|m| m.timestamp).max()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn alice_bob() -> ConversationId {
        ConversationId::new("alice", "bob").unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn text(sender: &str, secs: i64, body: &str) -> Message {
        Message::text(sender, at(secs), body.to_string())
    }

    #[test]
    fn append_assigns_unique_ids() {
        let store = MemoryStore::new();
        let conversation = alice_bob();

        let first = store.append(&conversation, &text("alice", 0, "a")).unwrap();
        let second = store.append(&conversation, &text("bob", 1, "b")).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.message_count(), 2);
    }

    #[test]
    fn append_ignores_existing_id() {
        let store = MemoryStore::new();
        let mut message = text("alice", 0, "a");
        message.id = Some(MessageId::new("stale"));

        let id = store.append(&alice_bob(), &message).unwrap();

        assert_ne!(id.as_str(), "stale");
        assert!(store.load(&alice_bob(), &MessageId::new("stale")).unwrap().is_none());
    }

    #[test]
    fn load_returns_stored_record_with_id() {
        let store = MemoryStore::new();
        let id = store.append(&alice_bob(), &text("alice", 0, "cipher")).unwrap();

        let loaded = store.load(&alice_bob(), &id).unwrap().unwrap();

        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.text.as_deref(), Some("cipher"));
    }

    #[test]
    fn load_is_scoped_to_conversation() {
        let store = MemoryStore::new();
        let id = store.append(&alice_bob(), &text("alice", 0, "a")).unwrap();
        let other = ConversationId::new("alice", "carol").unwrap();

        assert!(store.load(&other, &id).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_timestamp_then_insertion() {
        let store = MemoryStore::new();
        let conversation = alice_bob();

        store.append(&conversation, &text("alice", 5, "late")).unwrap();
        store.append(&conversation, &text("bob", 1, "early-1")).unwrap();
        store.append(&conversation, &text("alice", 1, "early-2")).unwrap();

        let bodies: Vec<_> = store
            .list(&conversation)
            .unwrap()
            .into_iter()
            .filter_map(|m| m.text)
            .collect();

        assert_eq!(bodies, ["early-1", "early-2", "late"]);
    }

    #[test]
    fn list_unknown_conversation_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list(&alice_bob()).unwrap().is_empty());
    }

    #[test]
    fn update_overwrites_record() {
        let store = MemoryStore::new();
        let id = store.append(&alice_bob(), &text("alice", 0, "old")).unwrap();

        let mut message = store.load(&alice_bob(), &id).unwrap().unwrap();
        message.text = Some("new".to_string());
        message.edited = true;
        store.update(&alice_bob(), &message).unwrap();

        let loaded = store.load(&alice_bob(), &id).unwrap().unwrap();
        assert_eq!(loaded.text.as_deref(), Some("new"));
        assert!(loaded.edited);
    }

    #[test]
    fn update_without_id_is_rejected() {
        let store = MemoryStore::new();
        let result = store.update(&alice_bob(), &text("alice", 0, "x"));
        assert_eq!(result, Err(StoreError::MissingId));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let mut message = text("alice", 0, "x");
        message.id = Some(MessageId::new("m99"));

        let result = store.update(&alice_bob(), &message);

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn latest_timestamp_tracks_newest() {
        let store = MemoryStore::new();
        let conversation = alice_bob();

        assert_eq!(store.latest_timestamp(&conversation).unwrap(), None);

        store.append(&conversation, &text("alice", 10, "a")).unwrap();
        store.append(&conversation, &text("bob", 3, "b")).unwrap();

        assert_eq!(store.latest_timestamp(&conversation).unwrap(), Some(at(10)));
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();

        store.append(&alice_bob(), &text("alice", 0, "a")).unwrap();

        assert_eq!(clone.message_count(), 1);
    }
}
