mod commands;
mod util;
mod webhook;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use commands::session::SessionCommands;
use commands::{Context, ModeArg};

#[derive(Parser)]
#[command(
    name = "labourlex",
    version,
    about = "labourlex — terminal client for the Indian labour law compliance assistant"
)]
struct Cli {
    /// Workflow webhook URL
    #[arg(long, env = "LABOURLEX_WEBHOOK_URL", global = true)]
    webhook_url: Option<String>,

    /// Request timeout in seconds (no timeout when omitted)
    #[arg(long, env = "LABOURLEX_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Session file (defaults to <config dir>/labourlex/session.json)
    #[arg(long, env = "LABOURLEX_SESSION_FILE", global = true)]
    session_file: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "LABOURLEX_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation
    Chat {
        /// View mode for new replies
        #[arg(long, value_enum, default_value_t = ModeArg::Chat)]
        mode: ModeArg,
    },
    /// Ask a single question and print the reply
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// View mode for the reply
        #[arg(long, value_enum, default_value_t = ModeArg::Chat)]
        mode: ModeArg,
        /// Print the conversation as JSON instead of rendered text
        #[arg(long)]
        json: bool,
    },
    /// Render a saved workflow reply offline
    Render {
        /// Reply file (use '-' for stdin)
        #[arg(long, short = 'f', default_value = "-")]
        file: String,
        /// How to display structured reports
        #[arg(long, value_enum, default_value_t = ModeArg::Report)]
        view: ModeArg,
        /// Print variant, normalized content and rendering as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the conversation session id
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "labourlex=warn,labourlex_core=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let ctx = Context {
        webhook_url: cli.webhook_url,
        timeout: cli.timeout_secs.map(Duration::from_secs),
        session_path: cli.session_file.unwrap_or_else(util::default_session_path),
    };

    let code = match cli.command {
        Commands::Chat { mode } => commands::chat::run(&ctx, mode).await,
        Commands::Ask { query, mode, json } => commands::ask::run(&ctx, &query, mode, json).await,
        Commands::Render { file, view, json } => commands::render::run(&file, view, json),
        Commands::Session { command } => commands::session::run(&ctx, command),
    };

    std::process::exit(code);
}
