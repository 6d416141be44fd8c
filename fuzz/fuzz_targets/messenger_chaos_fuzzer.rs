//! Fuzz target for messenger operations under store failures
//!
//! Drives a three-user conversation graph through a `ChaoticStore` that fails
//! writes at a fuzzed rate.
//!
//! # Strategy
//!
//! - Failure rates from 0% to 90%
//! - Arbitrary sequences of send, edit, delete, forward and receipt updates
//! - Operations on ids that exist, never existed, or belong to the peer
//!
//! # Invariants
//!
//! - Messenger NEVER panics on store errors
//! - Store failures surface as transient errors
//! - Every rendered row is readable: plaintext or a sentinel
//! - Deleted rows always render the placeholder
//! - A failed forward writes nothing to the target conversation

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_client::{
    ChaoticStore, ClientError, ConversationId, FileAttachment, Identity, MemoryStore, MessageId,
    MessageStore, Messenger, SimEnv,
};
use parley_crypto::DELETED_PLACEHOLDER;

#[derive(Debug, Clone, Arbitrary)]
struct ChaosScenario {
    chaos_seed: u64,
    env_seed: u64,
    /// 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    operations: Vec<Operation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Operation {
    SendText { from: u8, to: u8, text: String },
    SendFile { from: u8, to: u8, name: String, size: u32, forwardable: bool },
    Edit { actor: u8, peer: u8, slot: u8, text: String },
    Delete { actor: u8, peer: u8, slot: u8 },
    Forward { actor: u8, source: u8, slot: u8, target: u8 },
    MarkRead { actor: u8, peer: u8 },
    MarkDelivered { actor: u8, peer: u8 },
    Render { actor: u8, peer: u8 },
}

const USERS: [&str; 3] = ["alice", "bob", "carol"];

fn user(index: u8) -> Identity {
    Identity::new(USERS[usize::from(index) % USERS.len()])
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let backing = MemoryStore::new();
    let store = ChaoticStore::with_seed(backing.clone(), failure_rate, scenario.chaos_seed);
    let env = SimEnv::with_seed(scenario.env_seed);

    let messengers: Vec<_> = (0..3u8)
        .map(|i| Messenger::new(user(i), store.clone(), env.clone()))
        .collect();
    let mut sent: Vec<MessageId> = Vec::new();

    let pick = |slot: u8, sent: &[MessageId]| -> MessageId {
        if sent.is_empty() || slot == u8::MAX {
            MessageId::new("never-written")
        } else {
            sent[usize::from(slot) % sent.len()].clone()
        }
    };

    for operation in scenario.operations.into_iter().take(64) {
        let result = match operation {
            Operation::SendText { from, to, text } => {
                let messenger = &messengers[usize::from(from) % 3];
                messenger.send_text(&user(to), &text, None).map(|id| sent.push(id))
            },
            Operation::SendFile { from, to, name, size, forwardable } => {
                let messenger = &messengers[usize::from(from) % 3];
                let attachment =
                    FileAttachment::new(name, "https://blob/f", u64::from(size), "image/png")
                        .forwardable(forwardable);
                messenger.send_file(&user(to), &attachment, None).map(|id| sent.push(id))
            },
            Operation::Edit { actor, peer, slot, text } => {
                messengers[usize::from(actor) % 3].edit(&user(peer), &pick(slot, &sent), &text)
            },
            Operation::Delete { actor, peer, slot } => {
                messengers[usize::from(actor) % 3].delete(&user(peer), &pick(slot, &sent))
            },
            Operation::Forward { actor, source, slot, target } => {
                let actor_id = user(actor);
                let target_id = user(target);
                let target_conversation =
                    ConversationId::new(&actor_id.user_id, &target_id.user_id).expect("fixed ids");
                let before = backing.list(&target_conversation).expect("memory store").len();

                let result = messengers[usize::from(actor) % 3]
                    .forward(&user(source), &pick(slot, &sent), &target_id);

                if result.is_err() {
                    let after = backing.list(&target_conversation).expect("memory store").len();
                    assert_eq!(before, after, "failed forward wrote to the target");
                }
                result.map(|id| sent.push(id))
            },
            Operation::MarkRead { actor, peer } => {
                messengers[usize::from(actor) % 3].mark_read(&user(peer)).map(drop)
            },
            Operation::MarkDelivered { actor, peer } => {
                messengers[usize::from(actor) % 3].mark_delivered(&user(peer)).map(drop)
            },
            Operation::Render { actor, peer } => {
                let rendered = messengers[usize::from(actor) % 3]
                    .render(&user(peer))
                    .expect("reads never fail");
                for row in rendered {
                    if let Some(text) = &row.text {
                        assert!(!text.as_str().is_empty());
                    }
                    if row.record.deleted {
                        let shown = row.text.as_ref().map(|t| t.as_str());
                        assert_eq!(shown, Some(DELETED_PLACEHOLDER));
                    }
                }
                Ok(())
            },
        };

        if let Err(ClientError::Store(error)) = result {
            assert!(error.is_transient(), "unexpected store error: {error}");
        }
    }
});
