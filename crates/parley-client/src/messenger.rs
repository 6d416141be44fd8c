//! Message orchestration for one local user.
//!
//! [`Messenger`] applies the conversation cipher at every point where a
//! message field crosses the store boundary:
//!
//! - send: `text` / `fileName` are sealed under the pair key before `append`
//! - render: fields are opened under the same key; failures become sentinels
//! - edit / delete: the replacement is sealed under the same key
//! - forward: fields are moved from the source pair key to the target pair
//!   key before the copy is written
//!
//! All operations are synchronous. The store is the only shared state.

use chrono::{DateTime, Utc};
use parley_crypto::{ConversationId, ConversationKey, Decryption, Seal, envelope, reencrypt};

use crate::{
    config::ClientConfig,
    env::Environment,
    error::ClientError,
    message::{FileAttachment, Message, MessageId, MessageKind, ReplyTo},
    store::MessageStore,
};

/// Largest attachment accepted by [`Messenger::send_file`] (50 MiB).
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Reply preview text for image attachments.
pub const PHOTO_PREVIEW: &str = "Photo";

/// Reply preview text for other attachments.
pub const ATTACHMENT_PREVIEW: &str = "Attachment";

/// A participant: account id plus optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Account identifier, the input to key derivation
    pub user_id: String,
    /// Name shown to other users
    pub display_name: Option<String>,
}

impl Identity {
    /// Identity without a display name.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), display_name: None }
    }

    /// Set the display name.
    #[must_use]
    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Delivery state of an own message, as shown to its author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receipt {
    /// Written to the store
    Sent,
    /// Seen by the recipient's client
    Delivered,
    /// Opened by the recipient
    Read,
}

impl Receipt {
    fn of(message: &Message) -> Self {
        if message.read {
            Self::Read
        } else if message.delivered {
            Self::Delivered
        } else {
            Self::Sent
        }
    }
}

/// Decrypted view of a reply snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPreview {
    /// Replied-to message
    pub message_id: MessageId,
    /// Author of the replied-to message
    pub sender_id: String,
    /// Author display name recorded at reply time
    pub sender_name: Option<String>,
    /// `Photo`, `Attachment`, or the decrypted body
    pub text: String,
}

/// A stored message with its encrypted fields opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// The record as stored
    pub record: Message,
    /// Decrypted body (text messages)
    pub text: Option<Decryption>,
    /// Decrypted attachment name (file messages)
    pub file_name: Option<Decryption>,
    /// Preview of the replied-to message
    pub reply: Option<ReplyPreview>,
    /// Delivery state; only for the local user's non-deleted messages
    pub receipt: Option<Receipt>,
    /// Written by the local user
    pub is_own: bool,
    /// Attachment may be downloaded by the local user
    pub downloadable: bool,
}

/// Message operations on behalf of one local user.
///
/// Every operation takes the peer and derives the conversation (store key)
/// and the conversation key from `(local user, peer)`.
#[derive(Clone)]
pub struct Messenger<S: MessageStore, E: Environment> {
    identity: Identity,
    store: S,
    env: E,
    config: ClientConfig,
}

impl<S: MessageStore, E: Environment> Messenger<S, E> {
    /// Messenger with the default configuration.
    pub fn new(identity: Identity, store: S, env: E) -> Self {
        Self { identity, store, env, config: ClientConfig::default() }
    }

    /// Messenger with an explicit configuration.
    ///
    /// # Errors
    ///
    /// - `Config` if the configuration fails [`ClientConfig::validate`]
    pub fn with_config(
        identity: Identity,
        store: S,
        env: E,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self { identity, store, env, config })
    }

    /// The local user.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a text message.
    ///
    /// # Errors
    ///
    /// - `EmptyMessage` if `text` is empty or whitespace-only
    /// - `ReplyTargetNotFound` if `reply_to` is not in the conversation
    /// - `Cipher` if either participant identifier is blank
    /// - `Store` if the write fails
    pub fn send_text(
        &self,
        peer: &Identity,
        text: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<MessageId, ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let conversation = self.conversation(peer)?;
        let key = conversation.key();

        let ciphertext = self.seal(&key, text);
        let mut message = Message::text(&self.identity.user_id, self.env.now(), ciphertext);
        message.reply_to = self.reply_snapshot(&conversation, peer, reply_to)?;

        let id = self.store.append(&conversation, &message)?;
        tracing::debug!(%conversation, %id, "sent text message");
        Ok(id)
    }

    /// Send a file message. The blob must already be uploaded.
    ///
    /// # Errors
    ///
    /// - `EmptyMessage` if the attachment name is blank
    /// - `FileTooLarge` if the attachment exceeds [`MAX_FILE_SIZE`]
    /// - `ReplyTargetNotFound` if `reply_to` is not in the conversation
    /// - `Cipher` if either participant identifier is blank
    /// - `Store` if the write fails
    pub fn send_file(
        &self,
        peer: &Identity,
        attachment: &FileAttachment,
        reply_to: Option<&MessageId>,
    ) -> Result<MessageId, ClientError> {
        if attachment.name.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        if attachment.size > MAX_FILE_SIZE {
            return Err(ClientError::FileTooLarge { size: attachment.size, max: MAX_FILE_SIZE });
        }

        let conversation = self.conversation(peer)?;
        let key = conversation.key();

        let encrypted_name = self.seal(&key, &attachment.name);
        let mut message =
            Message::file(&self.identity.user_id, self.env.now(), encrypted_name, attachment);
        message.reply_to = self.reply_snapshot(&conversation, peer, reply_to)?;

        let id = self.store.append(&conversation, &message)?;
        tracing::debug!(%conversation, %id, size = attachment.size, "sent file message");
        Ok(id)
    }

    /// Send a voice message. Nothing is encrypted.
    ///
    /// # Errors
    ///
    /// - `Cipher` if either participant identifier is blank
    /// - `Store` if the write fails
    pub fn send_audio(
        &self,
        peer: &Identity,
        url: &str,
        mime: &str,
    ) -> Result<MessageId, ClientError> {
        let conversation = self.conversation(peer)?;

        let message = Message::audio(&self.identity.user_id, self.env.now(), url, mime);

        let id = self.store.append(&conversation, &message)?;
        tracing::debug!(%conversation, %id, "sent voice message");
        Ok(id)
    }

    /// Every message of the conversation with its fields decrypted.
    ///
    /// Rows that do not decrypt render their sentinel; one bad row never
    /// hides the others.
    ///
    /// # Errors
    ///
    /// - `Cipher` if either participant identifier is blank
    /// - `Store` if the conversation cannot be listed
    pub fn render(&self, peer: &Identity) -> Result<Vec<RenderedMessage>, ClientError> {
        let conversation = self.conversation(peer)?;
        let key = conversation.key();

        let messages = self.store.list(&conversation)?;
        Ok(messages.into_iter().map(|message| self.render_one(&key, message)).collect())
    }

    fn render_one(&self, key: &ConversationKey, record: Message) -> RenderedMessage {
        let is_own = record.is_from(&self.identity.user_id);

        let text = match record.kind {
            MessageKind::Text => Some(open_field(key, record.text.as_deref())),
            MessageKind::File | MessageKind::Audio => None,
        };
        let file_name = match record.kind {
            MessageKind::File => Some(open_field(key, record.file_name.as_deref())),
            MessageKind::Text | MessageKind::Audio => None,
        };
        let reply = record.reply_to.as_ref().map(|reply| ReplyPreview {
            message_id: reply.message_id.clone(),
            sender_id: reply.sender_id.clone(),
            sender_name: reply.sender_name.clone(),
            text: preview_text(key, reply),
        });
        let receipt = (is_own && !record.deleted).then(|| Receipt::of(&record));
        let downloadable = is_own || record.allow_download;

        RenderedMessage { record, text, file_name, reply, receipt, is_own, downloadable }
    }

    /// Replace the body of an own text message.
    ///
    /// # Errors
    ///
    /// - `EmptyMessage` if `new_text` is empty or whitespace-only
    /// - `MessageNotFound` if `id` is not in the conversation
    /// - `NotAuthor` if the message was written by the peer
    /// - `NotEditable` if the message is deleted or not a text message
    /// - `Store` if the write fails
    pub fn edit(&self, peer: &Identity, id: &MessageId, new_text: &str) -> Result<(), ClientError> {
        if new_text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let conversation = self.conversation(peer)?;
        let mut message = self.load_own(&conversation, id)?;

        if message.deleted || message.kind != MessageKind::Text {
            return Err(ClientError::NotEditable { id: id.clone() });
        }

        message.text = Some(self.seal(&conversation.key(), new_text));
        message.edited = true;

        self.store.update(&conversation, &message)?;
        tracing::info!(%conversation, %id, "edited message");
        Ok(())
    }

    /// Replace an own message with a tombstone.
    ///
    /// The body becomes the configured placeholder sealed under the same
    /// key, the kind becomes text, and attachment metadata is cleared.
    /// Deleting a tombstone again succeeds without writing.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if `id` is not in the conversation
    /// - `NotAuthor` if the message was written by the peer
    /// - `Store` if the write fails
    pub fn delete(&self, peer: &Identity, id: &MessageId) -> Result<(), ClientError> {
        let conversation = self.conversation(peer)?;
        let mut message = self.load_own(&conversation, id)?;

        if message.deleted {
            tracing::debug!(%conversation, %id, "message already deleted");
            return Ok(());
        }

        message.text = Some(self.seal(&conversation.key(), &self.config.deleted_placeholder));
        message.kind = MessageKind::Text;
        message.deleted = true;
        message.file_name = None;
        message.file_url = None;
        message.file_size = None;
        message.file_type = None;

        self.store.update(&conversation, &message)?;
        tracing::info!(%conversation, %id, "deleted message");
        Ok(())
    }

    /// Copy a message into the conversation with another peer.
    ///
    /// The copy is authored by the local user, stamped now, and marked
    /// `forwarded`. Receipts and the reply snapshot are dropped. Encrypted
    /// fields are decrypted under the source pair and sealed under the
    /// target pair before the write. The source is never modified, so a
    /// failed write can be retried.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if `id` is not in the source conversation
    /// - `ForwardNotAllowed` if the message is deleted or not forwardable
    /// - `Cipher` if a field does not decrypt under the source pair
    /// - `Store` if the write fails
    pub fn forward(
        &self,
        source_peer: &Identity,
        id: &MessageId,
        target_peer: &Identity,
    ) -> Result<MessageId, ClientError> {
        let source = self.conversation(source_peer)?;
        let target = self.conversation(target_peer)?;

        let original = self
            .store
            .load(&source, id)?
            .ok_or_else(|| ClientError::MessageNotFound { id: id.clone() })?;

        if original.deleted || !original.allow_forward {
            return Err(ClientError::ForwardNotAllowed { id: id.clone() });
        }

        let me = self.identity.user_id.as_str();
        let from = (me, source_peer.user_id.as_str());
        let to = (me, target_peer.user_id.as_str());

        let mut copy = Message {
            id: None,
            sender_id: me.to_string(),
            timestamp: self.env.now(),
            read: false,
            delivered: false,
            edited: false,
            deleted: false,
            forwarded: true,
            read_at: None,
            delivered_at: None,
            reply_to: None,
            ..original
        };

        match copy.kind {
            MessageKind::Text => {
                if let Some(text) = copy.text.take() {
                    copy.text = Some(reencrypt(&text, from, to, self.next_seal())?);
                }
            },
            MessageKind::File => {
                if let Some(name) = copy.file_name.take() {
                    copy.file_name = Some(reencrypt(&name, from, to, self.next_seal())?);
                }
            },
            MessageKind::Audio => {},
        }

        let forwarded = self.store.append(&target, &copy)?;
        tracing::info!(from = %source, to = %target, %id, %forwarded, "forwarded message");
        Ok(forwarded)
    }

    /// Mark every unread message from the peer as read.
    ///
    /// Messages not yet delivered are marked delivered at the same time.
    /// Returns the number of messages updated.
    ///
    /// # Errors
    ///
    /// - `Store` if a read or write fails; earlier updates stay applied
    pub fn mark_read(&self, peer: &Identity) -> Result<usize, ClientError> {
        let conversation = self.conversation(peer)?;
        let now = self.env.now();

        let mut updated = 0;
        for mut message in self.store.list(&conversation)? {
            if !message.is_from(&peer.user_id) || message.read {
                continue;
            }

            message.read = true;
            message.read_at = Some(now);
            if !message.delivered {
                message.delivered = true;
                message.delivered_at = Some(now);
            }

            self.store.update(&conversation, &message)?;
            updated += 1;
        }

        if updated > 0 {
            tracing::debug!(%conversation, updated, "marked messages read");
        }
        Ok(updated)
    }

    /// Mark every undelivered message from the peer as delivered.
    ///
    /// Returns the number of messages updated.
    ///
    /// # Errors
    ///
    /// - `Store` if a read or write fails; earlier updates stay applied
    pub fn mark_delivered(&self, peer: &Identity) -> Result<usize, ClientError> {
        let conversation = self.conversation(peer)?;
        let now = self.env.now();

        let mut updated = 0;
        for mut message in self.store.list(&conversation)? {
            if !message.is_from(&peer.user_id) || message.delivered {
                continue;
            }

            message.delivered = true;
            message.delivered_at = Some(now);

            self.store.update(&conversation, &message)?;
            updated += 1;
        }

        if updated > 0 {
            tracing::debug!(%conversation, updated, "marked messages delivered");
        }
        Ok(updated)
    }

    /// Number of messages from the peer the local user has not read.
    ///
    /// # Errors
    ///
    /// - `Store` if the conversation cannot be listed
    pub fn unread_count(&self, peer: &Identity) -> Result<usize, ClientError> {
        let conversation = self.conversation(peer)?;

        Ok(self
            .store
            .list(&conversation)?
            .iter()
            .filter(|m| m.is_from(&peer.user_id) && !m.read)
            .count())
    }

    /// Peers ordered by their latest message, most recent first.
    ///
    /// Peers without messages come last in their given order.
    ///
    /// # Errors
    ///
    /// - `Cipher` if any peer identifier is blank
    /// - `Store` if a timestamp lookup fails
    pub fn conversations_by_recency(
        &self,
        peers: &[Identity],
    ) -> Result<Vec<Identity>, ClientError> {
        let mut ranked: Vec<(Option<DateTime<Utc>>, &Identity)> = peers
            .iter()
            .map(|peer| -> Result<_, ClientError> {
                let conversation = self.conversation(peer)?;
                Ok((self.store.latest_timestamp(&conversation)?, peer))
            })
            .collect::<Result<_, _>>()?;

        // None sorts below Some, so descending puts empty conversations last
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked.into_iter().map(|(_, peer)| peer.clone()).collect())
    }

    fn conversation(&self, peer: &Identity) -> Result<ConversationId, ClientError> {
        Ok(ConversationId::new(&self.identity.user_id, &peer.user_id)?)
    }

    fn next_seal(&self) -> Seal {
        self.config.envelope.seal_from(self.env.random_array())
    }

    fn seal(&self, key: &ConversationKey, plaintext: &str) -> String {
        envelope::seal(key, plaintext, self.next_seal())
    }

    fn load_own(
        &self,
        conversation: &ConversationId,
        id: &MessageId,
    ) -> Result<Message, ClientError> {
        let message = self
            .store
            .load(conversation, id)?
            .ok_or_else(|| ClientError::MessageNotFound { id: id.clone() })?;

        if !message.is_from(&self.identity.user_id) {
            return Err(ClientError::NotAuthor {
                id: id.clone(),
                user_id: self.identity.user_id.clone(),
            });
        }

        Ok(message)
    }

    fn reply_snapshot(
        &self,
        conversation: &ConversationId,
        peer: &Identity,
        reply_to: Option<&MessageId>,
    ) -> Result<Option<ReplyTo>, ClientError> {
        let Some(id) = reply_to else {
            return Ok(None);
        };

        let target = self
            .store
            .load(conversation, id)?
            .ok_or_else(|| ClientError::ReplyTargetNotFound { id: id.clone() })?;

        let sender_name = if target.is_from(&self.identity.user_id) {
            self.identity.display_name.clone()
        } else {
            peer.display_name.clone()
        };

        Ok(ReplyTo::from_message(&target, sender_name))
    }
}

/// Open an optional field; a missing field renders like an empty one.
fn open_field(key: &ConversationKey, field: Option<&str>) -> Decryption {
    envelope::open(key, field.unwrap_or_default())
}

fn preview_text(key: &ConversationKey, reply: &ReplyTo) -> String {
    match reply.file_type.as_deref() {
        Some(mime) if mime.starts_with("image/") => PHOTO_PREVIEW.to_string(),
        Some(_) => ATTACHMENT_PREVIEW.to_string(),
        None => open_field(key, reply.text.as_deref()).to_string(),
    }
}
