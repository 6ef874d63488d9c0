use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::models::*;
use crate::models::{Citation, Role, UploadHandle};
use crate::providers::traits::AssistantApi;
use crate::providers::types::*;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const ASSISTANTS_BETA: &str = "assistants=v1";
const FILE_PURPOSE: &str = "assistants";
const RETRIEVAL_TOOL: &str = "retrieval";

pub struct OpenAiAssistantClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAssistantClient {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self, ProviderError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ProviderError::AuthError("API key is empty".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", ASSISTANTS_BETA)
    }

    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }

    /// Send the request and decode a successful JSON body, mapping every
    /// failure onto a `ProviderError`.
    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ProviderError> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let response = Self::check_status(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let body = response.text().await.unwrap_or_default();
        let message = Self::parse_error_message(status, &body);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs,
                message,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthError(message));
        }

        Err(ProviderError::RequestFailed(message))
    }

    fn convert_run(run: OpenAiRun) -> Run {
        Run {
            id: run.id,
            status: run.status,
            last_error: run.last_error.map(|e| match e.code {
                Some(code) => format!("{}: {}", code, e.message),
                None => e.message,
            }),
        }
    }

    fn convert_message(message: OpenAiThreadMessage) -> ThreadMessage {
        let content = message
            .content
            .into_iter()
            .map(|item| match item {
                OpenAiMessageContent::Text { text } => ContentItem::Text {
                    citations: text
                        .annotations
                        .into_iter()
                        .filter_map(|a| match a {
                            OpenAiAnnotation::FileCitation {
                                text,
                                file_citation,
                            } => Some(Citation {
                                file_id: file_citation.file_id,
                                quote: file_citation.quote,
                                marker: text,
                            }),
                            OpenAiAnnotation::Other => None,
                        })
                        .collect(),
                    value: text.value,
                },
                OpenAiMessageContent::Other => ContentItem::Other,
            })
            .collect();

        ThreadMessage {
            id: message.id,
            role: Role::from_str(&message.role),
            content,
        }
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistantClient {
    async fn upload_file(&self, file: FileUpload) -> Result<UploadHandle, ProviderError> {
        tracing::debug!("Uploading {} ({} bytes)", file.filename, file.data.len());

        let part = Part::bytes(file.data).file_name(file.filename);
        let form = Form::new().text("purpose", FILE_PURPOSE).part("file", part);

        let object: OpenAiObject = self
            .execute(self.client.post(self.url("files")).multipart(form))
            .await?;

        Ok(UploadHandle::new(object.id))
    }

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<String, ProviderError> {
        let body = OpenAiAssistantRequest {
            name: &definition.name,
            instructions: &definition.instructions,
            model: &definition.model,
            tools: vec![OpenAiToolSpec {
                tool_type: RETRIEVAL_TOOL.to_string(),
            }],
            file_ids: &definition.file_ids,
        };

        let object: OpenAiObject = self
            .execute(self.client.post(self.url("assistants")).json(&body))
            .await?;
        Ok(object.id)
    }

    async fn create_thread(&self) -> Result<String, ProviderError> {
        let object: OpenAiObject = self
            .execute(
                self.client
                    .post(self.url("threads"))
                    .json(&serde_json::json!({})),
            )
            .await?;
        Ok(object.id)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<String, ProviderError> {
        let body = OpenAiMessageRequest {
            role: Role::User.as_str(),
            content,
        };

        let object: OpenAiObject = self
            .execute(
                self.client
                    .post(self.url(&format!("threads/{}/messages", thread_id)))
                    .json(&body),
            )
            .await?;
        Ok(object.id)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ProviderError> {
        let body = OpenAiRunRequest { assistant_id };

        let run: OpenAiRun = self
            .execute(
                self.client
                    .post(self.url(&format!("threads/{}/runs", thread_id)))
                    .json(&body),
            )
            .await?;
        Ok(Self::convert_run(run))
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        let run: OpenAiRun = self
            .execute(
                self.client
                    .get(self.url(&format!("threads/{}/runs/{}", thread_id, run_id))),
            )
            .await?;
        Ok(Self::convert_run(run))
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ProviderError> {
        let list: OpenAiMessageList = self
            .execute(
                self.client
                    .get(self.url(&format!("threads/{}/messages", thread_id))),
            )
            .await?;

        Ok(list.data.into_iter().map(Self::convert_message).collect())
    }
}
