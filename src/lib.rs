// Public modules
pub mod attachment;
pub mod auth;
pub mod authorizer;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod flight;
pub mod guard;
pub mod http;
pub mod orchestrator;
pub mod preferences;
pub mod render;
pub mod sessions;
pub mod shell;
pub mod token_store;
pub mod types;

mod observability;

// Re-exports
pub use attachment::{Attachment, Composer};
pub use auth::{AuthPhase, AuthSession, AuthState, LogoutOptions, derive_username};
pub use authorizer::Authorizer;
pub use chat::ChatApi;
pub use client::Aura;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use guard::{GuardDecision, Navigator, Route, RouteGuard, RouteHistory};
pub use http::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
pub use observability::register_biometrics;
pub use orchestrator::{ConversationView, SendOrchestrator, SubmitOutcome};
pub use preferences::UserPreferences;
pub use sessions::{SessionDirectory, SessionsApi};
pub use token_store::{FileStore, KeyValueStore, MemoryStore, TokenStore};
pub use types::*;
