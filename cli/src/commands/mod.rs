pub mod ask;
pub mod chat;
pub mod render;
pub mod session;

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use labourlex_core::ViewMode;
use labourlex_core::error::codes;

use crate::util::{exit_error, exit_with};
use crate::webhook::WebhookCollaborator;

/// Settings shared by every subcommand.
pub struct Context {
    pub webhook_url: Option<String>,
    pub timeout: Option<Duration>,
    pub session_path: PathBuf,
}

impl Context {
    /// The webhook client, or exit when no usable URL is configured.
    pub fn collaborator(&self) -> WebhookCollaborator {
        let url = self.webhook_url.as_deref().unwrap_or_else(|| {
            exit_error(
                "webhook URL is required to talk to the workflow",
                Some("Set --webhook-url or LABOURLEX_WEBHOOK_URL"),
            )
        });
        WebhookCollaborator::new(url, self.timeout).unwrap_or_else(|e| exit_with(codes::CLI_ERROR, &e, None, 4))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Short conversational answer
    Chat,
    /// Full compliance report
    Report,
}

impl From<ModeArg> for ViewMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Chat => ViewMode::Chat,
            ModeArg::Report => ViewMode::Report,
        }
    }
}
