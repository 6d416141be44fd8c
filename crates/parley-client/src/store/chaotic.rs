//! Chaotic store wrapper for fault injection testing
//!
//! Randomly fails writes so callers can prove that a failed write leaves the
//! store unchanged and that retrying succeeds. Reads always pass through.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use parley_crypto::ConversationId;

use super::{MessageStore, StoreError};
use crate::message::{Message, MessageId};

/// Store wrapper that randomly fails writes
///
/// Delegates to an underlying store but fails `append` and `update` with
/// [`StoreError::Unavailable`] at the configured rate. A failed write never
/// reaches the inner store. Clones share RNG state and counters.
#[derive(Clone)]
pub struct ChaoticStore<S: MessageStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Write attempts, including injected failures
    write_count: Arc<Mutex<usize>>,
}

/// Linear congruential generator, so failure patterns replay from a seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    #[allow(clippy::cast_precision_loss)]
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: MessageStore> ChaoticStore<S> {
    /// Wrap `inner` with a fixed default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x5eed_cafe_f00d_0001)
    }

    /// Wrap `inner` with an explicit seed for reproducible chaos.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            write_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of write attempts, including failed ones.
    #[allow(clippy::expect_used)]
    pub fn write_count(&self) -> usize {
        *self.write_count.lock().expect("write_count mutex poisoned")
    }

    /// Count the attempt and decide whether it fails.
    #[allow(clippy::expect_used)]
    fn inject(&self) -> Result<(), StoreError> {
        *self.write_count.lock().expect("write_count mutex poisoned") += 1;

        let roll = self.rng.lock().expect("ChaoticRng mutex poisoned").next();
        if roll < self.failure_rate {
            tracing::debug!(roll, "injecting store write failure");
            return Err(StoreError::Unavailable {
                reason: "chaotic failure injection".to_string(),
            });
        }

        Ok(())
    }
}

impl<S: MessageStore> MessageStore for ChaoticStore<S> {
    fn append(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<MessageId, StoreError> {
        self.inject()?;
        self.inner.append(conversation, message)
    }

    fn load(
        &self,
        conversation: &ConversationId,
        id: &MessageId,
    ) -> Result<Option<Message>, StoreError> {
        self.inner.load(conversation, id)
    }

    fn list(&self, conversation: &ConversationId) -> Result<Vec<Message>, StoreError> {
        self.inner.list(conversation)
    }

    fn update(&self, conversation: &ConversationId, message: &Message) -> Result<(), StoreError> {
        self.inject()?;
        self.inner.update(conversation, message)
    }

    fn latest_timestamp(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.inner.latest_timestamp(conversation)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::store::MemoryStore;

    fn alice_bob() -> ConversationId {
        ConversationId::new("alice", "bob").unwrap()
    }

    fn message() -> Message {
        Message::text("alice", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), "c".to_string())
    }

    #[test]
    fn zero_failure_rate_never_fails() {
        let chaotic = ChaoticStore::new(MemoryStore::new(), 0.0);

        for _ in 0..100 {
            chaotic.append(&alice_bob(), &message()).unwrap();
        }

        assert_eq!(chaotic.inner().message_count(), 100);
        assert_eq!(chaotic.write_count(), 100);
    }

    #[test]
    fn full_failure_rate_fails_writes_only() {
        let store = MemoryStore::new();
        let id = store.append(&alice_bob(), &message()).unwrap();
        let chaotic = ChaoticStore::new(store, 1.0);

        let error = chaotic.append(&alice_bob(), &message()).unwrap_err();
        assert!(error.is_transient());

        let stored = chaotic.load(&alice_bob(), &id).unwrap().unwrap();
        assert!(chaotic.update(&alice_bob(), &stored).is_err());
        assert_eq!(chaotic.list(&alice_bob()).unwrap().len(), 1);
        assert_eq!(chaotic.write_count(), 2);
    }

    #[test]
    fn failed_write_does_not_reach_inner_store() {
        let chaotic = ChaoticStore::new(MemoryStore::new(), 1.0);

        let _ = chaotic.append(&alice_bob(), &message());

        assert_eq!(chaotic.inner().message_count(), 0);
    }

    #[test]
    fn same_seed_same_failure_pattern() {
        let first = ChaoticStore::with_seed(MemoryStore::new(), 0.5, 42);
        let second = ChaoticStore::with_seed(MemoryStore::new(), 0.5, 42);

        for i in 0..100 {
            let a = first.append(&alice_bob(), &message());
            let b = second.append(&alice_bob(), &message());
            assert_eq!(a.is_ok(), b.is_ok(), "determinism violated at iteration {i}");
        }
    }

    #[test]
    #[should_panic(expected = "failure_rate must be between 0.0 and 1.0")]
    fn rejects_invalid_failure_rate() {
        let _chaotic = ChaoticStore::new(MemoryStore::new(), 1.5);
    }
}
