// Public modules
pub mod auth_response;
pub mod auth_user;
pub mod chat_request;
pub mod chat_response;
pub mod create_session_response;
pub mod message;
pub mod session_summary;
pub mod sessions_page;

// Re-exports
pub use auth_response::{AuthResponse, LoginRequest, LogoutRequest, RegisterRequest};
pub use auth_user::{AuthUser, KnownRole, Role};
pub use chat_request::ChatRequest;
pub use chat_response::ChatResponse;
pub use create_session_response::{CreateSessionResponse, UpdateSessionTitleRequest};
pub use message::{Author, Message, MessageAttachment};
pub use session_summary::SessionSummary;
pub use sessions_page::SessionsPage;
