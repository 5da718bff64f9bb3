use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Target conversation; `None` asks the server to create one.
    pub session_id: Option<i64>,

    /// The user's message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_sends_null_session() {
        let json = serde_json::to_value(ChatRequest {
            session_id: None,
            message: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"sessionId": null, "message": "hello"}));
    }
}
