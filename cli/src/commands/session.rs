use clap::Subcommand;
use labourlex_core::error::codes;
use serde_json::json;

use super::Context;
use crate::util::{exit_with, load_session, regenerate_session, to_pretty_json};

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Show the stored session id
    Show,
    /// Discard the stored session and start a new one
    New,
}

pub fn run(ctx: &Context, command: SessionCommands) -> i32 {
    let path = &ctx.session_path;
    let session = match command {
        SessionCommands::Show => load_session(path),
        SessionCommands::New => regenerate_session(path).map(Some),
    }
    .unwrap_or_else(|e| exit_with(codes::SESSION_ERROR, &e.to_string(), None, 1));

    let out = json!({
        "session_id": session.as_ref().map(|s| s.as_str()),
        "path": path.display().to_string(),
    });
    println!("{}", to_pretty_json(&out));
    0
}
