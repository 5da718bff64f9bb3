//! Conversation list: the `/api/sessions` endpoints and the sidebar state
//! built on them.

use std::sync::{Arc, Mutex, MutexGuard};

use url::form_urlencoded::Serializer;

use crate::auth::AuthSession;
use crate::error::Result;
use crate::http::ApiRequest;
use crate::types::{CreateSessionResponse, SessionsPage, UpdateSessionTitleRequest};

/// Page size used by the sidebar.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Title given to conversations created from the sidebar.
pub const NEW_CHAT_TITLE: &str = "New chat";

///////////////////////////////////////////// SessionsApi ////////////////////////////////////////////

/// Client for the session endpoints.
#[derive(Clone)]
pub struct SessionsApi {
    session: Arc<AuthSession>,
}

impl SessionsApi {
    /// Creates a client that sends through `session`.
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    /// Lists conversations matching `query`.
    pub async fn list(&self, query: &str, page: u32, size: u32) -> Result<SessionsPage> {
        let params = Serializer::new(String::new())
            .append_pair("q", query)
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string())
            .finish();
        let url = format!("{}?{params}", self.session.url("/api/sessions"));
        self.session.send(ApiRequest::get(url)).await?.json()
    }

    /// Creates an empty conversation, optionally titled.
    pub async fn create(&self, title: Option<&str>) -> Result<CreateSessionResponse> {
        let mut url = self.session.url("/api/sessions");
        if let Some(title) = title {
            let params = Serializer::new(String::new())
                .append_pair("title", title)
                .finish();
            url = format!("{url}?{params}");
        }
        let request = ApiRequest::post(url).json(&serde_json::json!({}))?;
        self.session.send(request).await?.json()
    }

    /// Renames a conversation.
    pub async fn update_title(&self, session_id: i64, title: &str) -> Result<()> {
        let url = self
            .session
            .url(&format!("/api/sessions/{session_id}/title"));
        let request = ApiRequest::patch(url).json(&UpdateSessionTitleRequest {
            title: title.to_string(),
        })?;
        self.session.send(request).await?;
        Ok(())
    }
}

////////////////////////////////////////// SessionDirectory //////////////////////////////////////////

#[derive(Debug, Default)]
struct DirectoryState {
    query: String,
    page: Option<SessionsPage>,
    loading: bool,
}

/// The sidebar's view of the conversation list.
pub struct SessionDirectory {
    api: SessionsApi,
    state: Mutex<DirectoryState>,
}

impl SessionDirectory {
    /// Creates an empty directory.  Nothing is loaded until
    /// [`SessionDirectory::refresh`] is called.
    pub fn new(api: SessionsApi) -> Self {
        Self {
            api,
            state: Mutex::new(DirectoryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The current search text.
    pub fn query(&self) -> String {
        self.lock().query.clone()
    }

    /// The last page loaded.
    pub fn page(&self) -> Option<SessionsPage> {
        self.lock().page.clone()
    }

    /// True while a list request is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Reloads the first page for the current query.
    pub async fn refresh(&self) -> Result<()> {
        let query = {
            let mut state = self.lock();
            state.loading = true;
            state.query.clone()
        };
        let result = self.api.list(&query, 0, DEFAULT_PAGE_SIZE).await;
        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(page) => {
                state.page = Some(page);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot load sessions");
                Err(err)
            }
        }
    }

    /// Sets the search text and reloads.
    pub async fn search(&self, query: &str) -> Result<()> {
        self.lock().query = query.trim().to_string();
        self.refresh().await
    }

    /// Creates a "New chat" conversation, reloads, and returns its id.
    pub async fn create(&self) -> Result<i64> {
        let created = self.api.create(Some(NEW_CHAT_TITLE)).await?;
        self.refresh().await?;
        Ok(created.session_id)
    }

    /// Renames a conversation and reloads.
    pub async fn rename(&self, session_id: i64, title: &str) -> Result<()> {
        self.api.update_title(session_id, title.trim()).await?;
        self.refresh().await
    }
}
