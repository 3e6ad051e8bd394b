//! Text rendering of conversation messages.

use serde_json::Value;

use crate::content::{HasContent, SAFETY_FALLBACK, Variant, answer_text, classify, plain_text};
use crate::conversation::{Message, Role, ViewMode};
use crate::report::text::value_text;
use crate::report::{Report, render_chat_view, render_report};

/// Render canonical content the way its variant and view mode ask for.
pub fn render_content(content: &Value, mode: ViewMode) -> String {
    match classify(content) {
        Variant::AbusiveOrHarmful => {
            let answer = answer_text(content)
                .filter(|a| a.has_content())
                .unwrap_or(SAFETY_FALLBACK);
            format!("⚠ {}", answer.trim())
        }
        Variant::GreetingOrGeneral => content.get("answer").map(value_text).unwrap_or_default(),
        Variant::StructuredReport => match mode {
            ViewMode::Chat => render_chat_view(content),
            ViewMode::Report => render_report(&Report::from_value(content)),
        },
        Variant::Plain => plain_text(content),
    }
}

/// Render one message of a transcript.
pub fn render_message(message: &Message) -> String {
    if message.role() == Role::User {
        return format!("> {}", message.text().unwrap_or_default());
    }
    if message.is_error() {
        return format!("✖ {}", message.text().unwrap_or_default());
    }

    let mode = message.view_mode().unwrap_or_default();
    let mut out = message
        .content()
        .map(|content| render_content(content, mode))
        .unwrap_or_default();
    if message.is_upgrading() {
        out.push_str("\n\n_Loading full report..._");
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_content, render_message};
    use crate::content::SAFETY_FALLBACK;
    use crate::conversation::{Conversation, TRANSPORT_APOLOGY, ViewChange, ViewMode};
    use crate::error::TransportError;
    use crate::session::SessionId;

    #[test]
    fn safety_reply_without_answer_uses_fallback() {
        let out = render_content(&json!({"type": "abusive_or_harmful"}), ViewMode::Chat);
        assert_eq!(out, format!("⚠ {SAFETY_FALLBACK}"));
    }

    #[test]
    fn safety_reply_uses_its_own_answer() {
        let out = render_content(
            &json!({"type": "abusive_or_harmful", "answer": "Please keep it civil."}),
            ViewMode::Report,
        );
        assert_eq!(out, "⚠ Please keep it civil.");
    }

    #[test]
    fn greeting_renders_answer_only() {
        let out = render_content(
            &json!({"type": "greeting_or_general", "answer": "Hello! Ask me about labour law."}),
            ViewMode::Report,
        );
        assert_eq!(out, "Hello! Ask me about labour law.");
    }

    #[test]
    fn report_follows_view_mode() {
        let content = json!({"answer": "Bonus is payable at 8.33%.", "key_points": ["Minimum bonus"]});
        assert_eq!(render_content(&content, ViewMode::Chat), "Bonus is payable at 8.33%.");
        let full = render_content(&content, ViewMode::Report);
        assert!(full.starts_with("# Legal Analysis Report"));
        assert!(full.contains("## Key Findings"));
    }

    #[test]
    fn plain_values_render_verbatim_or_as_json() {
        assert_eq!(render_content(&json!("Hello"), ViewMode::Chat), "Hello");
        assert_eq!(render_content(&json!([]), ViewMode::Report), "[]");
        assert_eq!(render_content(&json!({"foo": 1}), ViewMode::Report), "{\"foo\":1}");
    }

    #[test]
    fn messages_render_by_role_and_state() {
        let mut conversation = Conversation::new(SessionId::generate());
        let turn = conversation.submit("What is ESI?", ViewMode::Chat).unwrap();
        let user = turn.user_message();
        let reply = conversation.deliver(turn, Ok(json!({"answer": "ESI is insurance."}))).unwrap();
        let failed_turn = conversation.submit("again", ViewMode::Chat).unwrap();
        let failed = conversation
            .deliver(failed_turn, Err(TransportError::Network("down".to_string())))
            .unwrap();

        assert_eq!(render_message(conversation.message(user).unwrap()), "> What is ESI?");
        assert_eq!(render_message(conversation.message(reply).unwrap()), "ESI is insurance.");
        assert_eq!(
            render_message(conversation.message(failed).unwrap()),
            format!("✖ {TRANSPORT_APOLOGY}")
        );

        let ViewChange::Upgrade(_ticket) = conversation.request_view(reply, ViewMode::Report).unwrap() else {
            panic!("expected an upgrade");
        };
        let upgrading = render_message(conversation.message(reply).unwrap());
        assert!(upgrading.starts_with("ESI is insurance."));
        assert!(upgrading.ends_with("_Loading full report..._"));
    }
}
