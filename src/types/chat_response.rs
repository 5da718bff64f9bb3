use serde::{Deserialize, Serialize};

use crate::types::{Author, Message};

/// Response of `POST /api/chat` and `POST /api/chat/with-file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// The conversation the exchange was recorded in.
    pub session_id: i64,

    /// Id assigned to the user's message.
    pub user_message_id: i64,

    /// Id assigned to the assistant's reply.
    pub assistant_message_id: i64,

    /// The assistant's reply text.
    pub assistant_reply: String,

    /// Server timestamp of the reply.
    pub timestamp: String,

    /// True when the server created the conversation for this exchange.
    #[serde(default)]
    pub new_session: bool,
}

impl ChatResponse {
    /// The assistant reply as a thread entry.
    pub fn assistant_message(&self) -> Message {
        Message {
            id: self.assistant_message_id,
            author: Author::Assistant,
            content: self.assistant_reply.clone(),
            timestamp: self.timestamp.clone(),
            attachments: Vec::new(),
        }
    }
}
