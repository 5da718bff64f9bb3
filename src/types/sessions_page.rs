use serde::{Deserialize, Serialize};

use crate::types::SessionSummary;

/// Response of `GET /api/sessions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsPage {
    /// Sessions on this page.
    pub items: Vec<SessionSummary>,
    /// Total number of matching sessions.
    pub total: u64,
    /// Zero-based page index.
    pub page: u32,
    /// Page size.
    pub size: u32,
}
