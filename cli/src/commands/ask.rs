use labourlex_core::error::codes;
use labourlex_core::{Conversation, render_message};
use serde_json::json;

use super::{Context, ModeArg};
use crate::util::{exit_with, load_or_create_session, print_error, to_pretty_json};

/// Send a single query and print the reply.
pub async fn run(ctx: &Context, query: &[String], mode: ModeArg, as_json: bool) -> i32 {
    let collaborator = ctx.collaborator();
    let session = load_or_create_session(&ctx.session_path).unwrap_or_else(|e| {
        exit_with(codes::SESSION_ERROR, &e.to_string(), Some("Run `labourlex session new` to reset it"), 1)
    });

    let query = query.join(" ");
    let mut conversation = Conversation::new(session);
    let id = match conversation.ask(&collaborator, &query, mode.into()).await {
        Ok(id) => id,
        Err(e) => exit_with(codes::CONVERSATION_ERROR, &e.to_string(), None, 4),
    };
    let Some(reply) = conversation.message(id) else {
        return 1;
    };

    if as_json {
        let out = json!({
            "sessionId": conversation.session().as_str(),
            "messages": conversation.messages().iter().map(|m| m.to_json()).collect::<Vec<_>>(),
        });
        println!("{}", to_pretty_json(&out));
    } else {
        println!("{}", render_message(reply));
    }

    if reply.is_error() {
        print_error(
            codes::CONNECTION_ERROR,
            "workflow did not answer",
            Some("Check --webhook-url / LABOURLEX_WEBHOOK_URL and rerun with RUST_LOG=labourlex_core=debug"),
        );
        return 3;
    }
    0
}
