use thiserror::Error;

/// Failure talking to the workflow webhook. Every variant is recoverable:
/// the conversation degrades to an apology message (new turns) or to the
/// previous display state (report upgrades).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The webhook answered with a non-2xx status
    #[error("workflow returned HTTP {status}")]
    Status { status: u16 },
    /// Connection refused, DNS failure, timeout, ...
    #[error("could not reach workflow: {0}")]
    Network(String),
    /// The response body could not be read
    #[error("could not read workflow response: {0}")]
    Body(String),
}

/// Rejected conversation operations. These never mutate state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("no message with id {0}")]
    UnknownMessage(u64),
    #[error("message {0} has no report view (user or error message)")]
    NotSwitchable(u64),
    #[error("a report upgrade for message {0} is already in flight")]
    UpgradeInFlight(u64),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Machine-readable error codes printed by the CLI
pub mod codes {
    pub const CLI_ERROR: &str = "cli_error";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const INVALID_PAYLOAD: &str = "invalid_payload";
    pub const CONVERSATION_ERROR: &str = "conversation_error";
    pub const SESSION_ERROR: &str = "session_error";
}
