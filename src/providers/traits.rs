use async_trait::async_trait;

use super::types::{AssistantDefinition, FileUpload, ProviderError, Run, ThreadMessage};
use crate::models::UploadHandle;

/// The remote assistant service: files, assistants, threads, messages and runs.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn upload_file(&self, file: FileUpload) -> Result<UploadHandle, ProviderError>;

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<String, ProviderError>;

    async fn create_thread(&self) -> Result<String, ProviderError>;

    async fn create_message(&self, thread_id: &str, content: &str)
        -> Result<String, ProviderError>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ProviderError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError>;

    /// Messages of a thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ProviderError>;
}
