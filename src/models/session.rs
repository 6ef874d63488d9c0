use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;

/// Remote identifier of a document submitted to the assistant service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadHandle(String);

impl UploadHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UploadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single conversation a user holds with an assistant over a set of
/// uploaded documents. Messages are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub documents: Vec<UploadHandle>,
    #[serde(default)]
    pub document_names: Vec<String>,
    pub assistant_id: String,
    pub thread_id: String,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        documents: Vec<UploadHandle>,
        document_names: Vec<String>,
        assistant_id: String,
        thread_id: String,
    ) -> Self {
        Self {
            name: session_name(documents.len()),
            documents,
            document_names,
            assistant_id,
            thread_id,
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

pub fn session_name(document_count: usize) -> String {
    if document_count == 1 {
        "Chat with 1 document".to_string()
    } else {
        format!("Chat with {} documents", document_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_session_name_pluralizes() {
        assert_eq!(session_name(1), "Chat with 1 document");
        assert_eq!(session_name(3), "Chat with 3 documents");
    }

    #[test]
    fn test_messages_keep_insertion_order() {
        let mut session = Session::new(
            vec![UploadHandle::new("file-a")],
            vec!["a.pdf".to_string()],
            "asst_1".to_string(),
            "thread_1".to_string(),
        );
        session.push_message(Message::new(Role::User, "question"));
        session.push_message(Message::new(Role::Assistant, "answer"));

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn test_upload_handle_serializes_as_string() {
        let json = serde_json::to_string(&UploadHandle::new("file-xyz")).unwrap();
        assert_eq!(json, "\"file-xyz\"");
    }
}
