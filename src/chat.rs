//! Calls to the `/api/chat` endpoints.

use std::sync::Arc;

use crate::attachment::Attachment;
use crate::auth::AuthSession;
use crate::error::Result;
use crate::http::{ApiRequest, FormPart};
use crate::types::{ChatRequest, ChatResponse, Message};

/// Client for the chat endpoints.
#[derive(Clone)]
pub struct ChatApi {
    session: Arc<AuthSession>,
}

impl ChatApi {
    /// Creates a client that sends through `session`.
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    /// Sends a text message.  A `None` session id asks the server to start a
    /// new conversation.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatResponse> {
        let request = ApiRequest::post(self.session.url("/api/chat")).json(body)?;
        self.session.send(request).await?.json()
    }

    /// Sends a message with an optional file as `multipart/form-data`.
    pub async fn chat_with_file(
        &self,
        message: &str,
        session_id: Option<i64>,
        file: Option<&Attachment>,
    ) -> Result<ChatResponse> {
        let mut parts = vec![FormPart::text("message", message)];
        if let Some(session_id) = session_id {
            parts.push(FormPart::text("sessionId", session_id.to_string()));
        }
        if let Some(file) = file {
            parts.push(file.form_part());
        }
        let request = ApiRequest::post(self.session.url("/api/chat/with-file")).multipart(parts);
        self.session.send(request).await?.json()
    }

    /// Loads a conversation's history.
    pub async fn messages(&self, session_id: i64) -> Result<Vec<Message>> {
        let url = self
            .session
            .url(&format!("/api/chat/session/{session_id}/messages"));
        self.session.send(ApiRequest::get(url)).await?.json()
    }

    /// Asks whether a conversation exists.
    pub async fn session_exists(&self, session_id: i64) -> Result<bool> {
        let url = self
            .session
            .url(&format!("/api/chat/session/{session_id}/exists"));
        self.session.send(ApiRequest::get(url)).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::PDF_MIME;
    use crate::auth::tests::session_with;
    use crate::http::testing::json;
    use crate::http::{ApiResponse, FormValue, RequestBody};
    use crate::types::Author;

    fn reply() -> serde_json::Value {
        serde_json::json!({
            "sessionId": 9,
            "userMessageId": 1,
            "assistantMessageId": 2,
            "assistantReply": "hi",
            "timestamp": "2025-03-01T10:00:00",
            "newSession": true
        })
    }

    #[tokio::test]
    async fn chat_posts_json_with_bearer() {
        let (session, transport, _) = session_with(Some("tok"), |_| json(200, reply()));
        let api = ChatApi::new(session);
        let res = api
            .chat(&ChatRequest {
                session_id: None,
                message: "hello".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(res.session_id, 9);
        let request = &transport.requests()[0];
        assert_eq!(request.url, "http://localhost:8080/api/chat");
        assert_eq!(request.bearer_token(), Some("tok"));
        assert_eq!(
            request.body,
            RequestBody::Json(serde_json::json!({"sessionId": null, "message": "hello"}))
        );
    }

    #[tokio::test]
    async fn chat_with_file_builds_form() {
        let (session, transport, _) = session_with(Some("tok"), |_| json(200, reply()));
        let api = ChatApi::new(session);
        let file = Attachment::new("cv.pdf", PDF_MIME, &b"%PDF"[..]);
        api.chat_with_file("summarize", Some(4), Some(&file))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.url, "http://localhost:8080/api/chat/with-file");
        let RequestBody::Multipart(parts) = &request.body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], FormPart::text("message", "summarize"));
        assert_eq!(parts[1], FormPart::text("sessionId", "4"));
        assert!(matches!(
            &parts[2].value,
            FormValue::File { file_name, .. } if file_name == "cv.pdf"
        ));
    }

    #[tokio::test]
    async fn chat_with_file_omits_absent_session() {
        let (session, transport, _) = session_with(Some("tok"), |_| json(200, reply()));
        let api = ChatApi::new(session);
        api.chat_with_file("hi", None, None).await.unwrap();
        let RequestBody::Multipart(parts) = &transport.requests()[0].body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.len(), 1);
    }

    #[tokio::test]
    async fn history_and_existence() {
        let (session, _, _) = session_with(Some("tok"), |request| {
            if request.url.ends_with("/messages") {
                json(
                    200,
                    serde_json::json!([
                        {"id": 1, "author": "USER", "content": "q", "timestamp": "t"},
                        {"id": 2, "author": "ASSISTANT", "content": "a", "timestamp": "t"}
                    ]),
                )
            } else {
                Ok(ApiResponse::new(200, "false"))
            }
        });
        let api = ChatApi::new(session);
        let messages = api.messages(3).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].author, Author::Assistant);
        assert!(!api.session_exists(3).await.unwrap());
    }
}
