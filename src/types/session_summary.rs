use serde::{Deserialize, Serialize};

/// One row of the session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Conversation id.
    pub session_id: i64,

    /// Title, if one has been set or generated.
    pub title: Option<String>,

    /// Short excerpt of the latest message.
    pub preview: Option<String>,

    /// Timestamp of the latest message.
    pub last_message_at: Option<String>,

    /// Number of messages in the conversation.
    pub message_count: u64,
}

impl SessionSummary {
    /// Title for display, falling back to a placeholder.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => "Untitled chat",
        }
    }
}
