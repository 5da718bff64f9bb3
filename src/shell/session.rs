//! The shell's command handling, independent of the terminal.

use crate::attachment::Attachment;
use crate::auth::{LogoutOptions, derive_username};
use crate::client::Aura;
use crate::guard::GuardDecision;
use crate::render::Renderer;
use crate::shell::ShellCommand;

/// Credentials the shell still needs a password for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAuth {
    /// Sign in as `email`.
    Login {
        /// Account email.
        email: String,
    },
    /// Register `email` as `username`.
    Register {
        /// Account email.
        email: String,
        /// Username to register.
        username: String,
    },
}

/// What the read loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Read the next line.
    Continue,
    /// Prompt for a password, then call [`Shell::authenticate`].
    Password(PendingAuth),
    /// Exit.
    Quit,
}

/// Drives an [`Aura`] client from shell input.
pub struct Shell {
    aura: Aura,
}

impl Shell {
    pub fn new(aura: Aura) -> Self {
        Self { aura }
    }

    pub fn aura(&self) -> &Aura {
        &self.aura
    }

    /// Enters the app if persisted credentials are still good.
    pub async fn start(&self, renderer: &mut dyn Renderer) {
        match self.aura.open_app().await {
            GuardDecision::Allow => {
                if let Some(user) = self.aura.session().user() {
                    renderer.print_info(&format!("Signed in as {}.", user.username));
                }
                self.list_sessions(None, renderer).await;
            }
            GuardDecision::Redirect(_) => {
                renderer.print_info("Not signed in. Use /login <email> or /register <email>.");
            }
        }
    }

    /// Runs one command.
    pub async fn run(&self, command: ShellCommand, renderer: &mut dyn Renderer) -> Step {
        match command {
            ShellCommand::Login { email } => return Step::Password(PendingAuth::Login { email }),
            ShellCommand::Register { email, username } => {
                let username = username.unwrap_or_else(|| derive_username(&email));
                return Step::Password(PendingAuth::Register { email, username });
            }
            ShellCommand::Quit => return Step::Quit,
            ShellCommand::Help => {
                for line in super::help_text().lines() {
                    renderer.print_info(&format!("    {line}"));
                }
            }
            ShellCommand::Invalid(message) => renderer.print_error(&message),
            ShellCommand::Logout => {
                self.aura.session().logout(LogoutOptions::default()).await;
                self.aura.orchestrator().new_draft();
                renderer.print_info("Signed out.");
            }
            command => {
                if self.require_app(renderer).await {
                    self.run_in_app(command, renderer).await;
                }
            }
        }
        Step::Continue
    }

    async fn run_in_app(&self, command: ShellCommand, renderer: &mut dyn Renderer) {
        let orchestrator = self.aura.orchestrator();
        match command {
            ShellCommand::WhoAmI => match self.aura.session().me().await {
                Ok(user) => renderer.print_user(&user),
                Err(err) => renderer.print_error(err.message()),
            },
            ShellCommand::Sessions(query) => self.list_sessions(query.as_deref(), renderer).await,
            ShellCommand::Open(session_id) => match orchestrator.select_session(session_id).await {
                Ok(()) => {
                    for message in orchestrator.messages() {
                        renderer.print_message(&message);
                    }
                }
                Err(err) => renderer.print_error(err.message()),
            },
            ShellCommand::New => {
                orchestrator.new_draft();
                renderer.print_info("New draft. Your next message starts a conversation.");
            }
            ShellCommand::Create => match self.aura.directory().create().await {
                Ok(session_id) => {
                    renderer.print_info(&format!("Created conversation {session_id}."));
                }
                Err(err) => renderer.print_error(err.message()),
            },
            ShellCommand::Rename { session_id, title } => {
                match self.aura.directory().rename(session_id, &title).await {
                    Ok(()) => renderer.print_info(&format!("Renamed {session_id} to {title}.")),
                    Err(err) => renderer.print_error(err.message()),
                }
            }
            ShellCommand::Attach(path) => {
                let staged = match Attachment::from_path(&path).await {
                    Ok(file) => orchestrator.stage_files(vec![file]),
                    Err(err) => Err(err),
                };
                match staged {
                    Ok(()) => renderer.print_info(&format!("Attached {path}.")),
                    Err(err) => renderer.print_error(err.message()),
                }
            }
            ShellCommand::Detach => {
                orchestrator.remove_attachment();
                renderer.print_info("Attachment removed.");
            }
            ShellCommand::Login { .. }
            | ShellCommand::Register { .. }
            | ShellCommand::Logout
            | ShellCommand::Help
            | ShellCommand::Quit
            | ShellCommand::Invalid(_) => {}
        }
    }

    /// Completes a login or registration with the password the user typed.
    pub async fn authenticate(
        &self,
        pending: PendingAuth,
        password: &str,
        renderer: &mut dyn Renderer,
    ) -> bool {
        let session = self.aura.session();
        let (result, is_register) = match &pending {
            PendingAuth::Login { email } => (session.login(email, password).await, false),
            PendingAuth::Register { email, username } => {
                (session.register(email, username, password).await, true)
            }
        };
        match result {
            Ok(auth) => {
                renderer.print_info(&format!("Welcome, {}.", auth.user.username));
                self.aura.orchestrator().new_draft();
                self.start(renderer).await;
                true
            }
            Err(err) => {
                renderer.print_error(err.auth_form_message(is_register));
                false
            }
        }
    }

    /// Sends a line as a chat message, with the staged file if any.
    pub async fn send(&self, line: &str, renderer: &mut dyn Renderer) {
        if !self.require_app(renderer).await {
            return;
        }
        let orchestrator = self.aura.orchestrator();
        let before = orchestrator.messages().len();
        orchestrator.set_draft(line);
        match orchestrator.submit_draft().await {
            Ok(_) => {
                for message in orchestrator.messages().iter().skip(before + 1) {
                    renderer.print_message(message);
                }
            }
            Err(err) if err.is_validation() || err.is_attachment() => {
                renderer.print_error(err.message())
            }
            Err(err) => {
                let shown = orchestrator
                    .error()
                    .unwrap_or_else(|| err.message().to_string());
                renderer.print_error(&shown);
            }
        }
    }

    async fn require_app(&self, renderer: &mut dyn Renderer) -> bool {
        match self.aura.guard().can_activate().await {
            GuardDecision::Allow => true,
            GuardDecision::Redirect(_) => {
                renderer.print_error("Sign in first with /login <email>.");
                false
            }
        }
    }

    async fn list_sessions(&self, query: Option<&str>, renderer: &mut dyn Renderer) {
        let directory = self.aura.directory();
        let result = match query {
            Some(query) => directory.search(query).await,
            None => directory.refresh().await,
        };
        match result {
            Ok(()) => {
                if let Some(page) = directory.page() {
                    renderer.print_sessions(&page);
                }
            }
            Err(err) => renderer.print_error(err.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ClientConfig;
    use crate::http::testing::{ScriptedTransport, json, user_json};
    use crate::http::{ApiRequest, ApiResponse};
    use crate::token_store::MemoryStore;
    use crate::types::{AuthUser, Message, SessionsPage};

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
        errors: Vec<String>,
    }

    impl Renderer for Recorder {
        fn print_message(&mut self, message: &Message) {
            self.lines.push(message.content.clone());
        }

        fn print_sessions(&mut self, page: &SessionsPage) {
            for item in &page.items {
                self.lines.push(item.display_title().to_string());
            }
        }

        fn print_user(&mut self, user: &AuthUser) {
            self.lines.push(user.email.clone());
        }

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn print_info(&mut self, info: &str) {
            self.lines.push(info.to_string());
        }
    }

    fn backend(request: &ApiRequest) -> crate::error::Result<ApiResponse> {
        let url = request.url.as_str();
        if url.ends_with("/api/auth/login") {
            if request.body
                == crate::http::RequestBody::Json(
                    serde_json::json!({"email": "ada@example.com", "password": "right"}),
                )
            {
                return json(
                    200,
                    serde_json::json!({"accessToken": "t", "tokenType": "Bearer", "user": user_json()}),
                );
            }
            return json(401, serde_json::json!({"message": "Bad credentials"}));
        }
        if url.ends_with("/api/auth/me") {
            return json(200, user_json());
        }
        if url.contains("/api/sessions") {
            return json(
                200,
                serde_json::json!({
                    "items": [{"sessionId": 1, "title": "Taxes", "preview": null,
                               "lastMessageAt": null, "messageCount": 2}],
                    "total": 1, "page": 0, "size": 30
                }),
            );
        }
        if url.ends_with("/api/chat") {
            return json(
                200,
                serde_json::json!({
                    "sessionId": 1, "userMessageId": 10, "assistantMessageId": 11,
                    "assistantReply": "Hello!", "timestamp": "t", "newSession": false
                }),
            );
        }
        Ok(ApiResponse::empty(404))
    }

    fn shell() -> (Shell, Arc<ScriptedTransport>) {
        let transport = ScriptedTransport::new(backend);
        let aura = Aura::with_parts(
            ClientConfig::new(),
            transport.clone(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        (Shell::new(aura), transport)
    }

    #[tokio::test]
    async fn commands_require_sign_in() {
        let (shell, transport) = shell();
        let mut out = Recorder::default();
        assert_eq!(shell.run(ShellCommand::Sessions(None), &mut out).await, Step::Continue);
        shell.send("hi", &mut out).await;
        assert_eq!(out.errors.len(), 2);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn login_then_chat() {
        let (shell, _) = shell();
        let mut out = Recorder::default();
        let step = shell
            .run(
                ShellCommand::Login {
                    email: "ada@example.com".to_string(),
                },
                &mut out,
            )
            .await;
        let Step::Password(pending) = step else {
            panic!("expected a password prompt");
        };
        assert!(!shell.authenticate(pending.clone(), "wrong", &mut out).await);
        assert_eq!(out.errors, vec!["Incorrect email or password."]);

        assert!(shell.authenticate(pending, "right", &mut out).await);
        assert!(out.lines.contains(&"Taxes".to_string()));

        shell.send("hi", &mut out).await;
        assert_eq!(out.lines.last().map(String::as_str), Some("Hello!"));
    }

    #[tokio::test]
    async fn register_derives_username() {
        let (shell, _) = shell();
        let mut out = Recorder::default();
        let step = shell
            .run(
                ShellCommand::Register {
                    email: "grace.hopper@example.com".to_string(),
                    username: None,
                },
                &mut out,
            )
            .await;
        assert_eq!(
            step,
            Step::Password(PendingAuth::Register {
                email: "grace.hopper@example.com".to_string(),
                username: "grace.hopper".to_string()
            })
        );
    }

    #[tokio::test]
    async fn quit_and_help() {
        let (shell, _) = shell();
        let mut out = Recorder::default();
        assert_eq!(shell.run(ShellCommand::Help, &mut out).await, Step::Continue);
        assert!(out.lines.iter().any(|l| l.contains("/attach")));
        assert_eq!(shell.run(ShellCommand::Quit, &mut out).await, Step::Quit);
    }
}
