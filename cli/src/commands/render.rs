use labourlex_core::error::codes;
use labourlex_core::{classify, render_content, unwrap_payload};
use serde_json::json;

use super::ModeArg;
use crate::util::{exit_with, read_payload, to_pretty_json};

/// Render a saved workflow reply without contacting the workflow.
pub fn run(file: &str, view: ModeArg, as_json: bool) -> i32 {
    let raw = read_payload(file).unwrap_or_else(|e| {
        exit_with(codes::INVALID_PAYLOAD, &e, Some("Pass a JSON file or pipe one via '-'"), 1)
    });

    let content = unwrap_payload(raw);
    let variant = classify(&content);
    tracing::debug!(?variant, "rendering saved reply");

    let rendered = render_content(&content, view.into());
    if as_json {
        let out = json!({
            "variant": variant,
            "content": content,
            "rendered": rendered,
        });
        println!("{}", to_pretty_json(&out));
    } else {
        println!("{rendered}");
    }
    0
}
