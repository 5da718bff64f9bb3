//! End-to-end tests of the Aura client against an in-process fake server.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    use aura::http::RequestBody;
    use aura::{
        ApiRequest, ApiResponse, Attachment, Aura, Author, ClientConfig, FileStore, GuardDecision,
        KeyValueStore, MemoryStore, Route, SubmitOutcome, Transport,
    };

    /// A tiny stand-in for the Aura backend.
    #[derive(Default)]
    struct FakeServer {
        log: Mutex<Vec<(String, Option<String>)>>,
        expire_tokens: AtomicBool,
        next_id: AtomicI64,
    }

    impl FakeServer {
        fn paths(&self) -> Vec<String> {
            self.log.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
        }

        fn bearers(&self) -> Vec<Option<String>> {
            self.log.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
        }

        fn reply(&self, status: u16, body: serde_json::Value) -> aura::Result<ApiResponse> {
            ApiResponse::from_json(status, &body)
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeServer {
        async fn execute(&self, request: ApiRequest) -> aura::Result<ApiResponse> {
            let path = request
                .url
                .strip_prefix("http://aura.test")
                .unwrap_or(&request.url)
                .to_string();
            let bearer = request.bearer_token().map(String::from);
            self.log.lock().unwrap().push((path.clone(), bearer.clone()));
            tokio::task::yield_now().await;

            let user = serde_json::json!({
                "id": "u-1", "email": "ada@example.com", "username": "ada", "role": "USER"
            });
            if path == "/api/auth/login" {
                return self.reply(
                    200,
                    serde_json::json!({
                        "accessToken": "fresh", "tokenType": "Bearer",
                        "user": user, "refreshToken": "r-1"
                    }),
                );
            }
            if bearer.is_none() || self.expire_tokens.load(Ordering::SeqCst) {
                return self.reply(401, serde_json::json!({"message": "token expired"}));
            }
            if path == "/api/auth/me" {
                return self.reply(200, user);
            }
            if path.starts_with("/api/sessions") {
                return self.reply(
                    200,
                    serde_json::json!({"items": [], "total": 0, "page": 0, "size": 30}),
                );
            }
            if path.starts_with("/api/chat") {
                let text = match &request.body {
                    RequestBody::Json(body) => body["message"].as_str().unwrap_or("").to_string(),
                    _ => "file".to_string(),
                };
                let id = self.next_id.fetch_add(2, Ordering::SeqCst) + 1;
                return self.reply(
                    200,
                    serde_json::json!({
                        "sessionId": 42,
                        "userMessageId": id,
                        "assistantMessageId": id + 1,
                        "assistantReply": format!("echo {text}"),
                        "timestamp": "2025-03-01T10:00:00",
                        "newSession": false
                    }),
                );
            }
            Ok(ApiResponse::empty(404))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new().with_api_base_url("http://aura.test/")
    }

    #[tokio::test]
    async fn persisted_token_is_validated_once() {
        let dir = std::env::temp_dir().join(format!("aura-it-{}", std::process::id()));
        let store = Arc::new(FileStore::new(&dir));
        store.set("aura.auth.token", "persisted").unwrap();

        let server = Arc::new(FakeServer::default());
        let aura = Aura::with_parts(
            config(),
            server.clone(),
            store.clone(),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        let guard = aura.guard();
        let (a, b) = tokio::join!(guard.can_activate(), guard.can_activate());
        assert_eq!(a, GuardDecision::Allow);
        assert_eq!(b, GuardDecision::Allow);
        assert_eq!(server.paths(), vec!["/api/auth/me"]);
        assert_eq!(aura.landing_route(), Route::App);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn login_chat_and_expiry() {
        let server = Arc::new(FakeServer::default());
        let storage = Arc::new(MemoryStore::new());
        let aura = Aura::with_parts(
            config(),
            server.clone(),
            storage.clone(),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();

        assert_eq!(
            aura.open_app().await,
            GuardDecision::Redirect(Route::Login)
        );
        assert!(server.paths().is_empty());

        aura.session().login("ada@example.com", "pw").await.unwrap();
        assert_eq!(storage.get("aura.auth.token").unwrap().as_deref(), Some("fresh"));
        assert_eq!(aura.open_app().await, GuardDecision::Allow);

        let orchestrator = aura.orchestrator();
        let (hello, world) = tokio::join!(orchestrator.submit("hello"), orchestrator.submit("world"));
        assert_eq!(hello.unwrap(), SubmitOutcome::Delivered);
        assert_eq!(world.unwrap(), SubmitOutcome::Queued);
        let thread: Vec<_> = orchestrator
            .messages()
            .into_iter()
            .map(|m| (m.author, m.content))
            .collect();
        assert_eq!(
            thread,
            vec![
                (Author::User, "hello".to_string()),
                (Author::Assistant, "echo hello".to_string()),
                (Author::User, "world".to_string()),
                (Author::Assistant, "echo world".to_string()),
            ]
        );
        assert_eq!(orchestrator.session_id(), Some(42));
        assert!(
            server.bearers()[1..]
                .iter()
                .all(|b| b.as_deref() == Some("fresh"))
        );

        server.expire_tokens.store(true, Ordering::SeqCst);
        let err = orchestrator.submit("still there?").await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!aura.session().has_token());
        assert_eq!(storage.get("aura.auth.token").unwrap(), None);
        assert_eq!(aura.history().current(), Route::Login);
        assert_eq!(aura.landing_route(), Route::Login);
    }

    #[tokio::test]
    async fn pdf_rules_hold_end_to_end() {
        let server = Arc::new(FakeServer::default());
        let aura = Aura::with_parts(
            config(),
            server.clone(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        aura.session().login("ada@example.com", "pw").await.unwrap();
        let orchestrator = aura.orchestrator();

        let pdf = Attachment::new("brief.pdf", "application/pdf", &b"%PDF-1.4"[..]);
        orchestrator.stage_files(vec![pdf.clone()]).unwrap();
        assert!(
            orchestrator
                .stage_files(vec![Attachment::new("photo.jpg", "image/jpeg", &b"jpg"[..])])
                .is_err()
        );
        assert_eq!(orchestrator.composer().attachment_count(), 1);

        let before = server.paths().len();
        let (text, file) = tokio::join!(
            orchestrator.submit("first"),
            orchestrator.submit_with_file("and this", pdf)
        );
        assert_eq!(text.unwrap(), SubmitOutcome::Delivered);
        assert!(file.unwrap_err().is_busy());
        let sent = &server.paths()[before..];
        assert!(sent.iter().all(|p| p != "/api/chat/with-file"));

        orchestrator.set_draft("read it");
        assert_eq!(orchestrator.submit_draft().await.unwrap(), SubmitOutcome::Delivered);
        assert!(server.paths().iter().any(|p| p == "/api/chat/with-file"));
        assert_eq!(orchestrator.composer().attachment_count(), 0);
    }
}
