//! Authentication session state.
//!
//! [`AuthSession`] owns the client's [`AuthState`] and is the only place it
//! changes.  The state lives in a `tokio::sync::watch` cell and every
//! transition replaces the whole value, so observers never see a half-updated
//! state.  Persisted tokens are written through to the [`TokenStore`]
//! immediately after each change.
//!
//! All HTTP traffic to the API goes through [`AuthSession::send`], which
//! applies the [`Authorizer`] decisions: it attaches the bearer token to
//! protected requests and ends the session on a 401 from one of them.

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::watch;

use crate::authorizer::{Authorizer, LOGOUT_PATH};
use crate::error::Result;
use crate::flight::{InFlight, Joined};
use crate::guard::{Navigator, Route};
use crate::http::{ApiRequest, ApiResponse, Transport, decode_error};
use crate::observability::{
    AUTH_LOGINS, AUTH_LOGOUTS, AUTH_PROBES, AUTH_PROBES_JOINED, CLIENT_REQUEST_DURATION,
    CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_UNAUTHORIZED,
};
use crate::token_store::TokenStore;
use crate::types::{AuthResponse, AuthUser, LoginRequest, LogoutRequest, RegisterRequest};

//////////////////////////////////////////// AuthState ////////////////////////////////////////////

/// Snapshot of the client's authentication.
///
/// `user` is only ever present together with `token`.  `validated` records
/// that an identity check has been attempted for the current token, so
/// `validated && user.is_none()` means the token exists but was not usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Current bearer credential.
    pub token: Option<String>,
    /// Identity for `token`, once known.
    pub user: Option<AuthUser>,
    /// An identity check has been attempted for `token`.
    pub validated: bool,
    /// Opaque rotation credential.
    pub refresh_token: Option<String>,
}

/// Where an [`AuthState`] sits in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No token.
    NoToken,
    /// A token whose identity has not been checked yet.
    Unvalidated,
    /// A token with a known identity.
    Authenticated,
    /// A token that was checked and could not be used.  It is kept, but
    /// the client is not authenticated.
    Rejected,
}

impl AuthState {
    /// Classifies this state.
    pub fn phase(&self) -> AuthPhase {
        match (&self.token, &self.user, self.validated) {
            (None, _, _) => AuthPhase::NoToken,
            (Some(_), Some(_), _) => AuthPhase::Authenticated,
            (Some(_), None, false) => AuthPhase::Unvalidated,
            (Some(_), None, true) => AuthPhase::Rejected,
        }
    }
}

/// Options for [`AuthSession::logout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogoutOptions {
    /// Clear locally without calling the server.
    pub skip_server: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Probe {
    Identity,
}

/////////////////////////////////////////// AuthSession ///////////////////////////////////////////

/// Process-wide authentication state and the authorized request pipeline.
pub struct AuthSession {
    base_url: String,
    transport: Arc<dyn Transport>,
    authorizer: Authorizer,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
    probes: InFlight<Probe, bool>,
}

impl AuthSession {
    /// Creates a session, reading any persisted tokens from `tokens`.
    ///
    /// The identity starts unknown; call [`AuthSession::ensure_authenticated`]
    /// to validate a persisted token.
    pub fn new(
        api_base_url: &str,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        Self::with_authorizer(
            api_base_url,
            Authorizer::new(api_base_url),
            transport,
            tokens,
            navigator,
        )
    }

    /// Creates a session with a custom [`Authorizer`].
    pub fn with_authorizer(
        api_base_url: &str,
        authorizer: Authorizer,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        let initial = AuthState {
            token: tokens.access_token(),
            user: None,
            validated: false,
            refresh_token: tokens.refresh_token(),
        };
        let (state, _) = watch::channel(initial);
        Arc::new(Self {
            base_url: api_base_url.trim_end_matches('/').to_string(),
            transport,
            authorizer,
            tokens,
            navigator,
            state,
            probes: InFlight::new(),
        })
    }

    /// Joins `path` onto the API base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The signed-in user, if known.
    pub fn user(&self) -> Option<AuthUser> {
        self.state.borrow().user.clone()
    }

    /// The current access token.
    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    /// True when an access token is held.
    pub fn has_token(&self) -> bool {
        self.state.borrow().token.is_some()
    }

    /// True when both a token and its identity are known.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().phase() == AuthPhase::Authenticated
    }

    /// The persisted token storage.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Signs in.  On success the tokens are persisted and the state becomes
    /// authenticated; failures are returned unchanged.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let request = ApiRequest::post(self.url("/api/auth/login")).json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let auth: AuthResponse = self.send(request).await?.json()?;
        self.set_auth(&auth);
        AUTH_LOGINS.click();
        tracing::info!(user = %auth.user.username, "signed in");
        Ok(auth)
    }

    /// Creates an account and signs in with it.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        let request = ApiRequest::post(self.url("/api/auth/register")).json(&RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let auth: AuthResponse = self.send(request).await?.json()?;
        self.set_auth(&auth);
        AUTH_LOGINS.click();
        tracing::info!(user = %auth.user.username, "registered");
        Ok(auth)
    }

    /// Fetches the identity for the current token.
    ///
    /// On success the user is merged into the state.  A 401 clears the
    /// session before the error is returned.
    pub async fn me(&self) -> Result<AuthUser> {
        let result = match self.send(ApiRequest::get(self.url("/api/auth/me"))).await {
            Ok(response) => response.json::<AuthUser>(),
            Err(err) => Err(err),
        };
        match result {
            Ok(user) => {
                self.set_user(user.clone());
                Ok(user)
            }
            Err(err) => {
                if err.is_authentication() {
                    self.clear_auth();
                }
                Err(err)
            }
        }
    }

    /// Signs out.
    ///
    /// Unless `skip_server` is set, the server is told first and any error it
    /// returns is ignored.  The local state is always cleared and the client
    /// is sent to the login route.
    pub async fn logout(&self, options: LogoutOptions) {
        let current = self.state();
        if !options.skip_server && (current.token.is_some() || current.refresh_token.is_some()) {
            let body = LogoutRequest {
                refresh_token: current.refresh_token.clone(),
            };
            match ApiRequest::post(self.url(LOGOUT_PATH)).json(&body) {
                Ok(request) => {
                    if let Err(err) = self.send(request).await {
                        tracing::debug!(error = %err, "server logout failed");
                    }
                }
                Err(err) => tracing::debug!(error = %err, "cannot encode logout request"),
            }
        }
        AUTH_LOGOUTS.click();
        self.end_session();
    }

    /// Erases persisted tokens and resets the state.  Idempotent.
    pub fn clear_auth(&self) {
        self.tokens.store(None, None);
        self.state.send_replace(AuthState::default());
    }

    /// Decides whether the client may enter the authenticated area.
    ///
    /// Without a token this is `false` and no request is made.  With a known
    /// identity it is `true`.  A token that was already checked and rejected
    /// is `false`.  Otherwise one identity probe runs; callers arriving while
    /// it is in flight share its result.
    pub async fn ensure_authenticated(self: &Arc<Self>) -> bool {
        let phase = self.state.borrow().phase();
        match phase {
            AuthPhase::NoToken | AuthPhase::Rejected => return false,
            AuthPhase::Authenticated => return true,
            AuthPhase::Unvalidated => {}
        }

        let this = Arc::clone(self);
        let (authenticated, joined) = self
            .probes
            .run(Probe::Identity, move || {
                async move { this.probe_identity().await }.boxed()
            })
            .await;
        match joined {
            Joined::Started => AUTH_PROBES.click(),
            Joined::Attached => AUTH_PROBES_JOINED.click(),
        }
        authenticated
    }

    async fn probe_identity(&self) -> bool {
        match self.me().await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(error = %err, "identity probe failed");
                self.state.send_if_modified(|state| {
                    if state.token.is_none() || state.validated {
                        return false;
                    }
                    *state = AuthState {
                        token: state.token.take(),
                        user: None,
                        validated: true,
                        refresh_token: state.refresh_token.take(),
                    };
                    true
                });
                false
            }
        }
    }

    /// Sends `request` through the authorization pipeline.
    ///
    /// Protected API requests carry the bearer token when one is held.  A
    /// 401 on a protected request (other than logout) ends the session; the
    /// error is still returned to the caller.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let classification = self.authorizer.classify(&request.url);
        let token = self.access_token();
        let request = self
            .authorizer
            .authorize(request, classification, token.as_deref())?;
        let method = request.method.clone();
        let url = request.url.clone();

        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let result = self.transport.execute(request).await;
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(%method, %url, error = %err, "request failed");
                return Err(err);
            }
        };
        if response.is_success() {
            return Ok(response);
        }

        CLIENT_REQUEST_ERRORS.click();
        if self.authorizer.should_invalidate(classification, response.status) {
            CLIENT_UNAUTHORIZED.click();
            tracing::info!(%method, %url, "unauthorized; ending session");
            self.end_session();
        }
        Err(decode_error(&response))
    }

    fn end_session(&self) {
        self.clear_auth();
        self.navigator.navigate(Route::Login);
    }

    fn set_auth(&self, auth: &AuthResponse) {
        self.tokens
            .store(Some(&auth.access_token), auth.refresh_token.as_deref());
        self.state.send_replace(AuthState {
            token: Some(auth.access_token.clone()),
            user: Some(auth.user.clone()),
            validated: true,
            refresh_token: auth.refresh_token.clone(),
        });
    }

    fn set_user(&self, user: AuthUser) {
        self.state.send_if_modified(|state| {
            if state.token.is_none() {
                return false;
            }
            *state = AuthState {
                token: state.token.take(),
                user: Some(user),
                validated: true,
                refresh_token: state.refresh_token.take(),
            };
            true
        });
    }
}

/// Derives a username from an email address for registration forms.
///
/// Takes the local part, keeps `[A-Za-z0-9._-]`, and truncates to 32
/// characters; falls back to `"user"`.
pub fn derive_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(32)
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}
