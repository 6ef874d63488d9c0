pub mod openai;
pub mod traits;
pub mod types;

pub use openai::OpenAiAssistantClient;
pub use traits::AssistantApi;
pub use types::{
    AssistantDefinition, ContentItem, FileUpload, ProviderError, Run, RunStatus, ThreadMessage,
};
