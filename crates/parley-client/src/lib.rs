//! Parley client
//!
//! Message orchestration for a two-party direct-messaging client whose
//! messages live in an external document store. Every field that crosses the
//! store boundary goes through the [`parley_crypto`] conversation cipher.
//!
//! # Components
//!
//! - [`Messenger`]: send, render, edit, delete, forward, read receipts
//! - [`MessageStore`]: synchronous store boundary, keyed by
//!   [`ConversationId`]
//! - [`MemoryStore`]: in-memory store for tests and simulation
//! - [`ChaoticStore`]: fault-injecting wrapper for retry testing
//! - [`Environment`]: time and randomness ([`SystemEnv`] in production,
//!   [`SimEnv`] for deterministic tests)
//! - [`ClientConfig`]: envelope format and deletion placeholder
//!
//! # Example
//!
//! ```
//! use parley_client::{Identity, MemoryStore, Messenger, SimEnv};
//!
//! let store = MemoryStore::new();
//! let alice = Messenger::new(Identity::new("alice"), store.clone(), SimEnv::with_seed(7));
//! let bob = Messenger::new(Identity::new("bob"), store, SimEnv::with_seed(8));
//!
//! alice.send_text(&Identity::new("bob"), "Hello", None).unwrap();
//!
//! let inbox = bob.render(&Identity::new("alice")).unwrap();
//! assert_eq!(inbox[0].text.as_ref().unwrap().as_str(), "Hello");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod env;
mod error;
mod message;
mod messenger;
pub mod store;

pub use config::ClientConfig;
pub use env::{Environment, SimEnv, SystemEnv};
pub use error::ClientError;
pub use message::{FileAttachment, Message, MessageId, MessageKind, ReplyTo};
pub use messenger::{
    ATTACHMENT_PREVIEW, Identity, MAX_FILE_SIZE, Messenger, PHOTO_PREVIEW, Receipt,
    RenderedMessage, ReplyPreview,
};
pub use parley_crypto::{ConversationId, Decryption, EnvelopeFormat};
pub use store::{ChaoticStore, MemoryStore, MessageStore, StoreError};
