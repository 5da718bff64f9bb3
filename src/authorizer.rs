//! Request authorization decisions.
//!
//! [`Authorizer`] is pure: it classifies URLs, attaches the bearer header,
//! and decides whether a response status invalidates the session.  The
//! side effects of that decision are carried out by
//! [`crate::AuthSession::send`].

use crate::error::Result;
use crate::http::ApiRequest;

/// Paths that never carry a bearer token.
pub const AUTH_EXEMPT_PATHS: &[&str] = &["/api/auth/login", "/api/auth/register"];

/// Path of the logout endpoint.
pub const LOGOUT_PATH: &str = "/api/auth/logout";

/// How a URL relates to the configured API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The URL is under `{base}/api/`.
    pub api: bool,
    /// The URL matches an exempt path.
    pub exempt: bool,
    /// The URL is the logout endpoint.
    pub logout: bool,
}

impl Classification {
    /// True when the request should carry the bearer token.
    pub fn needs_token(&self) -> bool {
        self.api && !self.exempt
    }

    /// True when a 401 on this request should end the session.
    pub fn invalidates_on_unauthorized(&self) -> bool {
        self.api && !self.exempt && !self.logout
    }
}

/// Decides which requests are authorized and how to react to 401.
#[derive(Debug, Clone)]
pub struct Authorizer {
    api_prefix: String,
    exempt_paths: Vec<String>,
}

impl Authorizer {
    /// Creates an authorizer for `api_base_url` with the default exemptions.
    pub fn new(api_base_url: &str) -> Self {
        Self::with_exemptions(api_base_url, AUTH_EXEMPT_PATHS.iter().copied())
    }

    /// Creates an authorizer with a custom exemption list.
    pub fn with_exemptions<'a>(
        api_base_url: &str,
        exempt_paths: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            api_prefix: format!("{}/api/", api_base_url.trim_end_matches('/')),
            exempt_paths: exempt_paths.into_iter().map(String::from).collect(),
        }
    }

    /// Classifies `url`.
    pub fn classify(&self, url: &str) -> Classification {
        Classification {
            api: url.starts_with(&self.api_prefix),
            exempt: self.exempt_paths.iter().any(|path| url.contains(path.as_str())),
            logout: url.contains(LOGOUT_PATH),
        }
    }

    /// Attaches `Authorization: Bearer {token}` when the request needs it
    /// and a token exists.  Requests without a token go out unauthenticated.
    pub fn authorize(
        &self,
        request: ApiRequest,
        classification: Classification,
        token: Option<&str>,
    ) -> Result<ApiRequest> {
        match token {
            Some(token) if classification.needs_token() => request.with_bearer(token),
            _ => Ok(request),
        }
    }

    /// True when `status` on a request with this classification must
    /// invalidate the session.
    pub fn should_invalidate(&self, classification: Classification, status: u16) -> bool {
        status == 401 && classification.invalidates_on_unauthorized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8080/";

    #[test]
    fn classify_api_and_exempt() {
        let authorizer = Authorizer::new(BASE);

        let chat = authorizer.classify("http://localhost:8080/api/chat");
        assert!(chat.api && !chat.exempt && !chat.logout);

        let login = authorizer.classify("http://localhost:8080/api/auth/login");
        assert!(login.api && login.exempt);

        let logout = authorizer.classify("http://localhost:8080/api/auth/logout");
        assert!(logout.needs_token());
        assert!(!logout.invalidates_on_unauthorized());

        let other = authorizer.classify("https://cdn.example.com/api/chat");
        assert!(!other.api);
    }

    #[test]
    fn bearer_only_for_protected_api_requests() {
        let authorizer = Authorizer::new(BASE);
        let url = "http://localhost:8080/api/chat";
        let request = authorizer
            .authorize(ApiRequest::post(url), authorizer.classify(url), Some("tok"))
            .unwrap();
        assert_eq!(request.bearer_token(), Some("tok"));

        let url = "http://localhost:8080/api/auth/login";
        let request = authorizer
            .authorize(ApiRequest::post(url), authorizer.classify(url), Some("tok"))
            .unwrap();
        assert_eq!(request.bearer_token(), None);

        let url = "http://localhost:8080/api/chat";
        let request = authorizer
            .authorize(ApiRequest::post(url), authorizer.classify(url), None)
            .unwrap();
        assert_eq!(request.bearer_token(), None);
    }

    #[test]
    fn invalidation_decision() {
        let authorizer = Authorizer::new(BASE);
        let chat = authorizer.classify("http://localhost:8080/api/chat");
        assert!(authorizer.should_invalidate(chat, 401));
        assert!(!authorizer.should_invalidate(chat, 403));

        let login = authorizer.classify("http://localhost:8080/api/auth/login");
        assert!(!authorizer.should_invalidate(login, 401));

        let logout = authorizer.classify("http://localhost:8080/api/auth/logout");
        assert!(!authorizer.should_invalidate(logout, 401));
    }

    #[test]
    fn custom_exemptions() {
        let authorizer =
            Authorizer::with_exemptions(BASE, ["/api/auth/login", "/api/auth/register", LOGOUT_PATH]);
        let logout = authorizer.classify("http://localhost:8080/api/auth/logout");
        assert!(!logout.needs_token());
    }
}
