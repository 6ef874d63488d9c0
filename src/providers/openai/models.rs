use serde::{Deserialize, Serialize};

use crate::providers::types::RunStatus;

// --- Request types ---

#[derive(Debug, Serialize)]
pub struct OpenAiAssistantRequest<'a> {
    pub name: &'a str,
    pub instructions: &'a str,
    pub model: &'a str,
    pub tools: Vec<OpenAiToolSpec>,
    pub file_ids: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct OpenAiToolSpec {
    #[serde(rename = "type")]
    pub tool_type: String,
}

#[derive(Debug, Serialize)]
pub struct OpenAiMessageRequest<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OpenAiRunRequest<'a> {
    pub assistant_id: &'a str,
}

// --- Response types ---

/// Files, assistants, threads and messages all answer with at least an `id`.
#[derive(Debug, Deserialize)]
pub struct OpenAiObject {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiRun {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<OpenAiRunError>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiRunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiMessageList {
    pub data: Vec<OpenAiThreadMessage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<OpenAiMessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum OpenAiMessageContent {
    #[serde(rename = "text")]
    Text { text: OpenAiText },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiText {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<OpenAiAnnotation>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum OpenAiAnnotation {
    #[serde(rename = "file_citation")]
    FileCitation {
        text: String,
        file_citation: OpenAiFileCitation,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiFileCitation {
    pub file_id: String,
    #[serde(default)]
    pub quote: Option<String>,
}

// --- Error types ---

#[derive(Debug, Deserialize)]
pub struct OpenAiErrorResponse {
    pub error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiErrorDetail {
    pub message: String,
}
