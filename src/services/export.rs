use crate::models::{Role, Session};

pub fn export_to_markdown(session: &Session) -> String {
    let mut output = format!("# {}\n\n", session.name);
    output.push_str(&format!(
        "> Date: {} | Thread: {}\n\n",
        session.created_at.format("%Y-%m-%d %H:%M"),
        session.thread_id
    ));

    if !session.document_names.is_empty() {
        output.push_str(&format!(
            "> Documents: {}\n\n",
            session.document_names.join(", ")
        ));
    }

    output.push_str("---\n\n");

    for msg in session.messages() {
        let role_label = match msg.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        output.push_str(&format!("### {}\n\n{}\n\n", role_label, msg.content));

        for (i, citation) in msg.citations.iter().enumerate() {
            match &citation.quote {
                Some(quote) => output.push_str(&format!(
                    "{}. {} ({}): \"{}\"\n",
                    i + 1,
                    citation.marker,
                    citation.file_id,
                    quote
                )),
                None => output.push_str(&format!(
                    "{}. {} ({})\n",
                    i + 1,
                    citation.marker,
                    citation.file_id
                )),
            }
        }
        if !msg.citations.is_empty() {
            output.push('\n');
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Citation, Message, UploadHandle};

    #[test]
    fn test_export_includes_messages_and_citations() {
        let mut session = Session::new(
            vec![UploadHandle::new("file-1")],
            vec!["q3.pdf".to_string()],
            "asst_1".to_string(),
            "thread_1".to_string(),
        );
        session.push_message(Message::new(Role::User, "How was Q3?"));
        session.push_message(
            Message::new(Role::Assistant, "Strong【0†source】").with_citations(vec![Citation {
                file_id: "file-1".to_string(),
                quote: Some("revenue up".to_string()),
                marker: "【0†source】".to_string(),
            }]),
        );

        let md = export_to_markdown(&session);

        assert!(md.starts_with("# Chat with 1 document\n"));
        assert!(md.contains("> Documents: q3.pdf"));
        assert!(md.contains("### You\n\nHow was Q3?"));
        assert!(md.contains("### Assistant\n\nStrong【0†source】"));
        assert!(md.contains("1. 【0†source】 (file-1): \"revenue up\""));
        assert!(md.find("### You").unwrap() < md.find("### Assistant").unwrap());
    }
}
