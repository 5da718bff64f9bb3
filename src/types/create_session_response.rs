use serde::{Deserialize, Serialize};

/// Response of `POST /api/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Id of the new conversation.
    pub session_id: i64,
    /// Title the server stored.
    #[serde(default)]
    pub title: Option<String>,
}

/// Body of `PATCH /api/sessions/{id}/title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSessionTitleRequest {
    /// The new title.
    pub title: String,
}
