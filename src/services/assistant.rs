use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::polling::{poll_until, PollPolicy, PollTimeout};
use super::session_store::SessionStore;
use super::settings::AppSettings;
use crate::config::APP_NAME;
use crate::models::{Message, Role, Session};
use crate::providers::{
    AssistantApi, AssistantDefinition, FileUpload, ProviderError, Run, RunStatus, ThreadMessage,
};

/// Returned instead of an error when a finished run left no readable reply.
pub const NO_REPLY_PLACEHOLDER: &str = "No response from the assistant.";

const MIN_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Assistant run {run_id} failed: {message}")]
    RunFailed { run_id: String, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Failed to read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Assistant did not finish: {0}")]
    TimedOut(#[from] PollTimeout),

    #[error("Failed to save session: {0}")]
    Storage(String),
}

#[derive(Debug, Clone)]
pub struct AssistantOptions {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub poll: PollPolicy,
}

impl From<&AppSettings> for AssistantOptions {
    fn from(settings: &AppSettings) -> Self {
        Self {
            name: format!("{} Assistant", APP_NAME),
            instructions: settings.assistant_instructions.clone(),
            model: settings.model.clone(),
            poll: PollPolicy::fixed(Duration::from_millis(
                settings.poll_interval_ms.max(MIN_POLL_INTERVAL_MS),
            ))
                .with_max_wait(settings.poll_timeout_secs.map(Duration::from_secs)),
        }
    }
}

/// Drives the remote assistant workflow: upload, create assistant, create
/// thread, then message/run/poll/fetch for every exchange.
pub struct AssistantService {
    api: Arc<dyn AssistantApi>,
    store: SessionStore,
    options: AssistantOptions,
}

impl AssistantService {
    pub fn new(api: Arc<dyn AssistantApi>, store: SessionStore, options: AssistantOptions) -> Self {
        Self {
            api,
            store,
            options,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Upload `documents`, set up an assistant and an empty thread, and make
    /// the result the current session. Nothing is stored unless every step
    /// succeeds.
    pub async fn create_session(&self, documents: &[PathBuf]) -> Result<Session, AssistantError> {
        if documents.is_empty() {
            return Err(AssistantError::Validation(
                "Select at least one document to chat with".to_string(),
            ));
        }

        let mut files = Vec::with_capacity(documents.len());
        for path in documents {
            files.push(read_document(path).await?);
        }
        let document_names: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();

        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let filename = file.filename.clone();
            let handle = self.api.upload_file(file).await?;
            tracing::debug!("Uploaded {} as {}", filename, handle);
            handles.push(handle);
        }

        let definition = AssistantDefinition {
            name: self.options.name.clone(),
            instructions: self.options.instructions.clone(),
            model: self.options.model.clone(),
            file_ids: handles.iter().map(|h| h.as_str().to_string()).collect(),
        };
        let assistant_id = self.api.create_assistant(&definition).await?;
        tracing::debug!("Created assistant {}", assistant_id);

        let thread_id = self.api.create_thread().await?;
        tracing::debug!("Created thread {}", thread_id);

        let session = Session::new(handles, document_names, assistant_id, thread_id);
        self.store
            .replace(session.clone())
            .await
            .map_err(|e| AssistantError::Storage(format!("{:#}", e)))?;

        tracing::info!(
            "Session ready: {} (assistant {}, thread {})",
            session.name,
            session.assistant_id,
            session.thread_id
        );
        Ok(session)
    }

    /// Post `text` to the session's thread, wait for the assistant's run to
    /// finish and return its reply.
    pub async fn send_message(&self, session: &Session, text: &str) -> Result<String, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::Validation("Message is empty".to_string()));
        }

        let thread_id = session.thread_id.as_str();

        let message_id = self.api.create_message(thread_id, text).await?;
        tracing::debug!("Posted message {} to thread {}", message_id, thread_id);
        self.record(thread_id, Message::new(Role::User, text)).await?;

        let started = self
            .api
            .create_run(thread_id, &session.assistant_id)
            .await?;
        tracing::debug!("Started run {} ({:?})", started.id, started.status);

        let finished = self.wait_for_run(thread_id, &started.id).await?;
        if finished.status == RunStatus::Failed {
            return Err(AssistantError::RunFailed {
                run_id: finished.id,
                message: finished
                    .last_error
                    .unwrap_or_else(|| "no details given".to_string()),
            });
        }

        let messages = self.api.list_messages(thread_id).await?;
        let reply = match latest_reply(&messages) {
            Some(reply) => reply,
            None => {
                tracing::warn!("Run {} completed without a text reply", finished.id);
                Message::new(Role::Assistant, NO_REPLY_PLACEHOLDER)
            }
        };

        let content = reply.content.clone();
        self.record(thread_id, reply).await?;
        Ok(content)
    }

    async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        let api = self.api.as_ref();
        poll_until(
            self.options.poll,
            move || async move {
                let run = api.retrieve_run(thread_id, run_id).await?;
                tracing::debug!("Run {} is {:?}", run.id, run.status);
                Ok::<Run, AssistantError>(run)
            },
            |run: &Run| run.status.is_terminal(),
        )
        .await
    }

    async fn record(&self, thread_id: &str, message: Message) -> Result<(), AssistantError> {
        self.store
            .append_message(thread_id, message)
            .await
            .map(|_| ())
            .map_err(|e| AssistantError::Storage(format!("{:#}", e)))
    }
}

/// The first assistant entry in a newest-first listing, as a local message.
fn latest_reply(messages: &[ThreadMessage]) -> Option<Message> {
    let (text, citations) = messages
        .iter()
        .find(|m| m.role == Some(Role::Assistant))?
        .primary_text()?;
    Some(Message::new(Role::Assistant, text).with_citations(citations.to_vec()))
}

async fn read_document(path: &Path) -> Result<FileUpload, AssistantError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| AssistantError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    Ok(FileUpload { filename, data })
}
