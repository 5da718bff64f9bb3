//! Navigation and the gate in front of the authenticated area.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::auth::AuthSession;

/// A destination in the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The login and register form.
    Login,
    /// The authenticated chat area.
    App,
}

impl Route {
    /// The path this route is served under.
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::App => "/app",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Performs navigation on behalf of the auth layer.
pub trait Navigator: Send + Sync {
    /// Moves the client to `route`.
    fn navigate(&self, route: Route);
}

/// A [`Navigator`] that remembers every navigation.
#[derive(Debug)]
pub struct RouteHistory {
    visited: Mutex<Vec<Route>>,
    initial: Route,
}

impl RouteHistory {
    /// Creates a history positioned at `initial`.
    pub fn new(initial: Route) -> Self {
        Self {
            visited: Mutex::new(Vec::new()),
            initial,
        }
    }

    /// The most recent destination.
    pub fn current(&self) -> Route {
        self.visited().last().copied().unwrap_or(self.initial)
    }

    /// Every navigation so far, oldest first.
    pub fn visited(&self) -> Vec<Route> {
        match self.visited.lock() {
            Ok(visited) => visited.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// How many times `route` has been navigated to.
    pub fn count(&self, route: Route) -> usize {
        self.visited().iter().filter(|r| **r == route).count()
    }
}

impl Default for RouteHistory {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

impl Navigator for RouteHistory {
    fn navigate(&self, route: Route) {
        tracing::debug!(%route, "navigate");
        match self.visited.lock() {
            Ok(mut visited) => visited.push(route),
            Err(poisoned) => poisoned.into_inner().push(route),
        }
    }
}

/// Outcome of consulting the [`RouteGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Proceed to the requested destination.
    Allow,
    /// Deny the destination and go here instead.
    Redirect(Route),
}

/// Gates entry to [`Route::App`].
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<AuthSession>,
}

impl RouteGuard {
    /// Creates a guard backed by `session`.
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    /// Allows navigation when the session is authenticated, otherwise
    /// redirects to the login route.
    pub async fn can_activate(&self) -> GuardDecision {
        if self.session.ensure_authenticated().await {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(Route::Login)
        }
    }
}
