//! Message records as stored in the shared message store.
//!
//! The record shape mirrors the documents the browser client writes: camelCase
//! field names, `type` for the message kind, and encrypted strings in `text`
//! and `fileName`. Everything else is unencrypted metadata.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a store-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Text body in `text` (encrypted).
    Text,
    /// Attachment; display name in `fileName` (encrypted).
    File,
    /// Voice recording; no encrypted field.
    Audio,
}

/// A message record.
///
/// # Invariants
///
/// - `text` is present only for [`MessageKind::Text`] and is ciphertext
/// - `file_name` is present only for [`MessageKind::File`] and is ciphertext
/// - Encrypted fields open under the key of the conversation the record is
///   stored in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Identifier assigned by the store; `None` before the first write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Content kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Account identifier of the author.
    pub sender_id: String,
    /// Time the message was written.
    pub timestamp: DateTime<Utc>,
    /// Encrypted body (text messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Encrypted attachment display name (file messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Blob storage URL (file and audio messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Attachment size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Attachment MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Recipient has opened the conversation since this arrived.
    #[serde(default)]
    pub read: bool,
    /// Recipient's client has seen the record.
    #[serde(default)]
    pub delivered: bool,
    /// Body was replaced after sending.
    #[serde(default)]
    pub edited: bool,
    /// Record is a tombstone.
    #[serde(default)]
    pub deleted: bool,
    /// Record was copied from another conversation.
    #[serde(default)]
    pub forwarded: bool,
    /// Recipient may forward this message.
    #[serde(default = "default_true")]
    pub allow_forward: bool,
    /// Recipient may download the attachment.
    #[serde(default = "default_true")]
    pub allow_download: bool,
    /// When the recipient read it.
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    /// When the recipient's client received it.
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Snapshot of the message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
}

fn default_true() -> bool {
    true
}

impl Message {
    /// Unsent record with default flags.
    fn new(kind: MessageKind, sender_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            kind,
            sender_id: sender_id.to_string(),
            timestamp,
            text: None,
            file_name: None,
            file_url: None,
            file_size: None,
            file_type: None,
            read: false,
            delivered: false,
            edited: false,
            deleted: false,
            forwarded: false,
            allow_forward: true,
            allow_download: true,
            read_at: None,
            delivered_at: None,
            reply_to: None,
        }
    }

    /// Text message carrying an encrypted body.
    pub fn text(sender_id: &str, timestamp: DateTime<Utc>, ciphertext: String) -> Self {
        Self { text: Some(ciphertext), ..Self::new(MessageKind::Text, sender_id, timestamp) }
    }

    /// File message carrying an encrypted display name.
    pub fn file(
        sender_id: &str,
        timestamp: DateTime<Utc>,
        encrypted_name: String,
        attachment: &FileAttachment,
    ) -> Self {
        Self {
            file_name: Some(encrypted_name),
            file_url: Some(attachment.url.clone()),
            file_size: Some(attachment.size),
            file_type: Some(attachment.mime.clone()),
            allow_forward: attachment.allow_forward,
            allow_download: attachment.allow_download,
            ..Self::new(MessageKind::File, sender_id, timestamp)
        }
    }

    /// Voice message pointing at an uploaded recording.
    pub fn audio(sender_id: &str, timestamp: DateTime<Utc>, url: &str, mime: &str) -> Self {
        Self {
            file_url: Some(url.to_string()),
            file_type: Some(mime.to_string()),
            ..Self::new(MessageKind::Audio, sender_id, timestamp)
        }
    }

    /// True if the message was written by `user_id`.
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }
}

/// Snapshot of a replied-to message, embedded in the reply.
///
/// Encrypted fields are copied verbatim; reply and target live in the same
/// conversation, so they open under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTo {
    /// Identifier of the replied-to message.
    pub message_id: MessageId,
    /// Author of the replied-to message.
    pub sender_id: String,
    /// Author display name at reply time.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Encrypted body of the target, if it was a text message.
    #[serde(default)]
    pub text: Option<String>,
    /// MIME type of the target's attachment.
    #[serde(default)]
    pub file_type: Option<String>,
    /// Encrypted display name of the target's attachment.
    #[serde(default)]
    pub file_name: Option<String>,
}

impl ReplyTo {
    /// Snapshot a stored message.
    ///
    /// Returns `None` if the target has not been stored yet.
    pub fn from_message(target: &Message, sender_name: Option<String>) -> Option<Self> {
        Some(Self {
            message_id: target.id.clone()?,
            sender_id: target.sender_id.clone(),
            sender_name,
            text: target.text.clone(),
            file_type: target.file_type.clone(),
            file_name: target.file_name.clone(),
        })
    }
}

/// Attachment metadata for a file message.
///
/// The blob itself is uploaded by the caller; only `name` is encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Display name shown to the recipient.
    pub name: String,
    /// Blob storage URL.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime: String,
    /// Recipient may forward the message.
    pub allow_forward: bool,
    /// Recipient may download the blob.
    pub allow_download: bool,
}

impl FileAttachment {
    /// Attachment that may be forwarded and downloaded.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        size: u64,
        mime: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            size,
            mime: mime.into(),
            allow_forward: true,
            allow_download: true,
        }
    }

    /// Set whether the recipient may forward the message.
    #[must_use]
    pub fn forwardable(mut self, allow: bool) -> Self {
        self.allow_forward = allow;
        self
    }

    /// Set whether the recipient may download the blob.
    #[must_use]
    pub fn downloadable(mut self, allow: bool) -> Self {
        self.allow_download = allow;
        self
    }
}
