use std::io::Write;

use labourlex_core::error::codes;
use labourlex_core::{Conversation, MessageId, SwitchOutcome, ViewMode, render_message};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{Context, ModeArg};
use crate::util::{exit_with, load_or_create_session, regenerate_session};

const HELP: &str = "\
Commands:
  /new           start a new conversation (fresh session)
  /report [n]    show message n (default: latest reply) as a full report
  /chat [n]      show message n (default: latest reply) as a short answer
  /history       list the conversation so far
  /help          show this help
  /quit          leave
Anything else is sent as a question.";

const SEARCHING: &str = "Searching legal precedents...";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Query(String),
    New,
    View { mode: ViewMode, target: Option<MessageId> },
    History,
    Help,
    Quit,
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Query(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();
    let mode = match name {
        "new" | "reset" => return Input::New,
        "history" => return Input::History,
        "help" | "?" => return Input::Help,
        "quit" | "exit" => return Input::Quit,
        "report" => ViewMode::Report,
        "chat" => ViewMode::Chat,
        other => return Input::Invalid(format!("unknown command '/{other}', try /help")),
    };
    match arg.map(str::parse::<u64>) {
        None => Input::View { mode, target: None },
        Some(Ok(n)) => Input::View {
            mode,
            target: Some(MessageId::from(n)),
        },
        Some(Err(_)) => Input::Invalid(format!("'/{name}' takes a message number, see /history")),
    }
}

/// Interactive conversation on stdin/stdout.
pub async fn run(ctx: &Context, mode: ModeArg) -> i32 {
    let collaborator = ctx.collaborator();
    let session = load_or_create_session(&ctx.session_path).unwrap_or_else(|e| {
        exit_with(codes::SESSION_ERROR, &e.to_string(), Some("Run `labourlex session new` to reset it"), 1)
    });
    let mode = ViewMode::from(mode);
    let mut conversation = Conversation::new(session);

    println!(
        "Indian labour law assistant (session {}). Type /help for commands.",
        conversation.session().short()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => exit_with(codes::CLI_ERROR, &format!("Failed to read stdin: {e}"), None, 1),
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => println!("{HELP}"),
            Input::Invalid(message) => eprintln!("{message}"),
            Input::History => print_history(&conversation),
            Input::New => match regenerate_session(&ctx.session_path) {
                Ok(session) => {
                    conversation.reset(session);
                    println!("Started a new conversation (session {}).", conversation.session().short());
                }
                Err(e) => eprintln!("Could not start a new session: {e}"),
            },
            Input::Query(query) => {
                eprintln!("{SEARCHING}");
                match conversation.ask(&collaborator, &query, mode).await {
                    Ok(id) => print_message(&conversation, id),
                    Err(e) => eprintln!("{e}"),
                }
            }
            Input::View { mode, target } => {
                let Some(id) = target.or_else(|| conversation.last_assistant_id()) else {
                    eprintln!("No reply to switch yet.");
                    continue;
                };
                if mode == ViewMode::Report {
                    eprintln!("Loading full report...");
                }
                match conversation.switch_view(&collaborator, id, mode).await {
                    Ok(SwitchOutcome::UpgradeFailed) => {
                        eprintln!("Could not load the full report, keeping the short answer.");
                    }
                    Ok(SwitchOutcome::Unchanged | SwitchOutcome::Switched | SwitchOutcome::Upgraded) => {
                        print_message(&conversation, id)
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    0
}

fn print_message(conversation: &Conversation, id: MessageId) {
    if let Some(message) = conversation.message(id) {
        println!("\n[{}] {}\n", id.get(), render_message(message));
    }
}

fn print_history(conversation: &Conversation) {
    if conversation.messages().is_empty() {
        println!("No messages yet.");
        return;
    }
    for message in conversation.messages() {
        let mut line = render_message(message);
        if let Some(first) = line.lines().next() {
            line = first.to_string();
        }
        let view = message.view_mode().map(|m| format!(" ({})", m.as_str())).unwrap_or_default();
        println!("[{}]{view} {line}", message.id.get());
    }
}
