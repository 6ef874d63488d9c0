use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Citation, Role};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limited: {message}{}", retry_hint(.retry_after_secs))]
    RateLimited {
        retry_after_secs: Option<u64>,
        message: String,
    },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

// --- Assistant setup ---

/// A document ready to be uploaded.
#[derive(Clone)]
pub struct FileUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("data", &format!("[{} bytes]", self.data.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantDefinition {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub file_ids: Vec<String>,
}

// --- Runs ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Only `completed` and `failed` end a wait; every other status keeps polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    pub last_error: Option<String>,
}

// --- Thread messages ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Text {
        value: String,
        citations: Vec<Citation>,
    },
    /// Image files and any content type this client does not render.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Option<Role>,
    pub content: Vec<ContentItem>,
}

impl ThreadMessage {
    /// First text content item with its citations, if any.
    pub fn primary_text(&self) -> Option<(&str, &[Citation])> {
        self.content.iter().find_map(|item| match item {
            ContentItem::Text { value, citations } => Some((value.as_str(), citations.as_slice())),
            ContentItem::Other => None,
        })
    }
}
