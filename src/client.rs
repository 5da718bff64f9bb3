use std::path::Path;
use std::sync::Arc;

use crate::auth::AuthSession;
use crate::chat::ChatApi;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::guard::{GuardDecision, Navigator, Route, RouteGuard, RouteHistory};
use crate::http::{ReqwestTransport, Transport};
use crate::orchestrator::SendOrchestrator;
use crate::preferences::UserPreferences;
use crate::sessions::{SessionDirectory, SessionsApi};
use crate::token_store::{FileStore, KeyValueStore, MemoryStore, TokenStore};

/// Client for the Aura chat service.
///
/// Wires one [`AuthSession`] into every component that talks to the API, so
/// they all share the same credentials and the same 401 handling.
pub struct Aura {
    config: ClientConfig,
    session: Arc<AuthSession>,
    history: Arc<RouteHistory>,
    chat: ChatApi,
    sessions: SessionsApi,
    directory: Arc<SessionDirectory>,
    orchestrator: Arc<SendOrchestrator>,
    preferences: UserPreferences,
}

impl Aura {
    /// Create a new client.
    ///
    /// Tokens live in memory unless `token_dir` is set; preferences are kept
    /// under `storage_dir` when it is set.  The two never share a store.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(config.timeout())?);
        let tokens = store_for(config.token_dir.as_deref());
        let preferences = store_for(config.storage_dir.as_deref());
        Self::with_parts(config, transport, tokens, preferences)
    }

    /// Create a client configured from `AURA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over a caller-supplied transport, token storage, and
    /// preference storage.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn KeyValueStore>,
        preferences: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        config.validate()?;
        let history = Arc::new(RouteHistory::default());
        let session = AuthSession::new(
            config.normalized_base_url(),
            transport,
            TokenStore::new(tokens),
            history.clone(),
        );
        let chat = ChatApi::new(session.clone());
        let sessions = SessionsApi::new(session.clone());
        let directory = Arc::new(SessionDirectory::new(sessions.clone()));
        let orchestrator =
            Arc::new(SendOrchestrator::new(chat.clone()).with_directory(directory.clone()));
        let preferences = UserPreferences::new(preferences);
        tracing::debug!(base_url = config.normalized_base_url(), "client ready");
        Ok(Self {
            config,
            session,
            history,
            chat,
            sessions,
            directory,
            orchestrator,
            preferences,
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared authentication session.
    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Navigation performed so far.
    pub fn history(&self) -> &Arc<RouteHistory> {
        &self.history
    }

    /// The chat endpoints.
    pub fn chat(&self) -> &ChatApi {
        &self.chat
    }

    /// The session endpoints.
    pub fn sessions(&self) -> &SessionsApi {
        &self.sessions
    }

    /// The sidebar's conversation list.
    pub fn directory(&self) -> &Arc<SessionDirectory> {
        &self.directory
    }

    /// The conversation view's send pipeline.
    pub fn orchestrator(&self) -> &Arc<SendOrchestrator> {
        &self.orchestrator
    }

    /// Avatar and accent color.
    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    /// A guard over the shared session.
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.session.clone())
    }

    /// Where the login screen should send the user right away: the app when
    /// the session is already authenticated, otherwise nowhere.
    pub fn landing_route(&self) -> Route {
        if self.session.is_authenticated() {
            Route::App
        } else {
            Route::Login
        }
    }

    /// Navigates to the authenticated area if the guard allows it, or to the
    /// login route otherwise.
    pub async fn open_app(&self) -> GuardDecision {
        let decision = self.guard().can_activate().await;
        match decision {
            GuardDecision::Allow => self.history.navigate(Route::App),
            GuardDecision::Redirect(route) => self.history.navigate(route),
        }
        decision
    }
}

fn store_for(dir: Option<&Path>) -> Arc<dyn KeyValueStore> {
    match dir {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => Arc::new(MemoryStore::new()),
    }
}
