use serde::{Deserialize, Serialize};

/// A single entry in a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned id, or a negative local id for an optimistic entry.
    pub id: i64,

    /// Who wrote the message.
    pub author: Author,

    /// Message text.
    pub content: String,

    /// Timestamp as sent by the server (RFC 3339 for local entries).
    pub timestamp: String,

    /// Attachment metadata; the file content is never kept in the thread.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MessageAttachment>,
}

/// Author of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Author {
    /// The signed-in user.
    User,
    /// The assistant.
    Assistant,
}

/// Name, size and content type of a file sent with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    /// File name.
    pub name: String,

    /// Size in bytes.
    pub size: u64,

    /// MIME type.
    #[serde(rename = "type")]
    pub r#type: String,
}

impl Message {
    /// Returns true if this entry has not been confirmed by the server.
    pub fn is_local(&self) -> bool {
        self.id < 0
    }
}
