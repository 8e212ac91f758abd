//! Transcript export formats

use crate::error::Result;
use crate::types::ChatMessage;

/// Render a transcript as Markdown: one `**Role:** content` paragraph per
/// message, separated by blank lines.
pub fn to_markdown(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for (i, msg) in messages.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!("**{}:** {}", msg.role.label(), msg.content));
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Render a transcript as a pretty-printed JSON array of `{role, content}`.
pub fn to_json(messages: &[ChatMessage]) -> Result<String> {
    Ok(serde_json::to_string_pretty(messages)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("What is Rust?"),
            ChatMessage::assistant("A systems language.\nFast too."),
        ]
    }

    #[test]
    fn test_markdown() {
        assert_eq!(
            to_markdown(&transcript()),
            "**User:** What is Rust?\n\n**Assistant:** A systems language.\nFast too.\n"
        );
        assert_eq!(to_markdown(&[]), "");
    }

    #[test]
    fn test_json_has_exactly_role_and_content() {
        let json = to_json(&transcript()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["role"], "user");
        assert_eq!(items[1]["content"], "A systems language.\nFast too.");
        assert_eq!(items[0].as_object().unwrap().len(), 2);

        assert_eq!(to_json(&[]).unwrap(), "[]");
    }
}
