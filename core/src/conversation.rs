//! Conversation state: the ordered message list, per-message view modes and
//! the report upgrade flow.
//!
//! Network calls are split from state changes. [`Conversation::submit`] and
//! [`Conversation::request_view`] hand out a request to send; the matching
//! [`Conversation::deliver`] / [`Conversation::complete_upgrade`] apply its
//! result as one patch. [`Conversation::ask`] and [`Conversation::switch_view`]
//! do both halves for callers with nothing else in flight.
//!
//! Policies for racing completions:
//! - a completion issued under an earlier session (before [`Conversation::reset`])
//!   is dropped;
//! - assistant replies are appended in arrival order and record the user
//!   message they answer in `reply_to`;
//! - while a message has an upgrade in flight, every view request for it is
//!   rejected with [`ConversationError::UpgradeInFlight`].

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::content::{Variant, classify};
use crate::error::{ConversationError, TransportError};
use crate::payload::unwrap_payload;
use crate::session::SessionId;

/// Shown in place of a reply when the workflow cannot be reached.
pub const TRANSPORT_APOLOGY: &str = "I apologize, but I encountered an error connecting to the \
legal database. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// How a delivered reply is displayed. `Chat` shows only the top-level
/// answer of a report; `Report` shows every section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Chat,
    Report,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Chat => "chat",
            ViewMode::Report => "report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Body POSTed to the workflow webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRequest {
    pub query: String,
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ViewMode>,
}

/// The external workflow that answers queries.
pub trait Collaborator {
    /// Send one request. Non-2xx responses and connection failures are errors;
    /// the returned value is the raw, still-wrapped response body.
    fn send(
        &self,
        request: &CollaboratorRequest,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpgradeState {
    Idle,
    InFlight { ticket: u64 },
}

#[derive(Debug, Clone, PartialEq)]
struct DeliveredReply {
    content: Value,
    variant: Variant,
    view_mode: ViewMode,
    has_report_data: bool,
    upgrade: UpgradeState,
}

#[derive(Debug, Clone, PartialEq)]
enum MessageBody {
    User { text: String },
    Delivered(DeliveredReply),
    Errored { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
    /// For assistant messages: the query that produced them
    pub original_query: Option<String>,
    /// For assistant messages: the user message they answer
    pub reply_to: Option<MessageId>,
    body: MessageBody,
}

impl Message {
    pub fn role(&self) -> Role {
        match self.body {
            MessageBody::User { .. } => Role::User,
            MessageBody::Delivered(_) | MessageBody::Errored { .. } => Role::Assistant,
        }
    }

    /// User query text, or the apology of an errored reply.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::User { text } | MessageBody::Errored { text } => Some(text),
            MessageBody::Delivered(_) => None,
        }
    }

    /// Canonical (unwrapped) content of a delivered reply.
    pub fn content(&self) -> Option<&Value> {
        self.delivered().map(|reply| &reply.content)
    }

    pub fn variant(&self) -> Option<Variant> {
        self.delivered().map(|reply| reply.variant)
    }

    pub fn view_mode(&self) -> Option<ViewMode> {
        self.delivered().map(|reply| reply.view_mode)
    }

    pub fn has_report_data(&self) -> bool {
        self.delivered().is_some_and(|reply| reply.has_report_data)
    }

    pub fn is_upgrading(&self) -> bool {
        self.delivered()
            .is_some_and(|reply| matches!(reply.upgrade, UpgradeState::InFlight { .. }))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, MessageBody::Errored { .. })
    }

    /// Flat JSON rendering of the message, for `--json` output.
    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "id": self.id,
            "role": self.role(),
            "createdAt": self.created_at.to_rfc3339(),
            "hasReportData": self.has_report_data(),
            "isUpgrading": self.is_upgrading(),
            "isError": self.is_error(),
        });
        if let Some(text) = self.text() {
            out["text"] = json!(text);
        }
        if let Some(reply) = self.delivered() {
            out["content"] = reply.content.clone();
            out["variant"] = json!(reply.variant);
            out["viewMode"] = json!(reply.view_mode);
        }
        if let Some(query) = &self.original_query {
            out["originalQuery"] = json!(query);
        }
        if let Some(reply_to) = self.reply_to {
            out["replyTo"] = json!(reply_to);
        }
        out
    }

    fn delivered(&self) -> Option<&DeliveredReply> {
        match &self.body {
            MessageBody::Delivered(reply) => Some(reply),
            _ => None,
        }
    }
}

/// A submitted query waiting for the workflow's answer.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    session: SessionId,
    user_message: MessageId,
    query: String,
    mode: ViewMode,
}

impl PendingTurn {
    pub fn request(&self) -> CollaboratorRequest {
        CollaboratorRequest {
            query: self.query.clone(),
            session_id: self.session.clone(),
            mode: Some(self.mode),
        }
    }

    pub fn user_message(&self) -> MessageId {
        self.user_message
    }
}

/// An outstanding report re-fetch for one message.
#[derive(Debug, Clone)]
pub struct UpgradeTicket {
    session: SessionId,
    message: MessageId,
    ticket: u64,
    query: String,
}

impl UpgradeTicket {
    pub fn request(&self) -> CollaboratorRequest {
        CollaboratorRequest {
            query: self.query.clone(),
            session_id: self.session.clone(),
            mode: Some(ViewMode::Report),
        }
    }

    pub fn message(&self) -> MessageId {
        self.message
    }
}

/// Result of asking for a view mode.
#[derive(Debug)]
pub enum ViewChange {
    /// Already showing that mode
    Unchanged,
    /// Switched locally, no request needed
    Switched,
    /// Report data must be fetched first; send `ticket.request()` and pass
    /// the result to [`Conversation::complete_upgrade`]
    Upgrade(UpgradeTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Upgraded,
    /// The fetch failed; the message keeps its previous content and view
    Failed,
    /// The ticket no longer matches any in-flight upgrade
    Dropped,
}

/// What [`Conversation::switch_view`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Unchanged,
    Switched,
    Upgraded,
    UpgradeFailed,
}

#[derive(Debug)]
pub struct Conversation {
    session: SessionId,
    messages: Vec<Message>,
    next_id: u64,
    next_ticket: u64,
}

impl Conversation {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            messages: Vec::new(),
            next_id: 1,
            next_ticket: 1,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Most recent assistant message, errored or not.
    pub fn last_assistant_id(&self) -> Option<MessageId> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::Assistant)
            .map(|m| m.id)
    }

    /// Start a new conversation under `session`. Message ids keep counting up
    /// so completions for the old conversation can never hit a new message.
    pub fn reset(&mut self, session: SessionId) {
        tracing::info!(old = %self.session, new = %session, "starting new conversation");
        self.session = session;
        self.messages.clear();
    }

    /// Append the user's query and return the request to send.
    pub fn submit(&mut self, query: &str, mode: ViewMode) -> Result<PendingTurn, ConversationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ConversationError::EmptyQuery);
        }

        let id = self.allocate_id();
        self.messages.push(Message {
            id,
            created_at: Utc::now(),
            original_query: None,
            reply_to: None,
            body: MessageBody::User {
                text: query.to_string(),
            },
        });

        Ok(PendingTurn {
            session: self.session.clone(),
            user_message: id,
            query: query.to_string(),
            mode,
        })
    }

    /// Append the assistant's reply to `turn`. Returns `None` when the turn
    /// belongs to a conversation that has since been reset.
    pub fn deliver(
        &mut self,
        turn: PendingTurn,
        result: Result<Value, TransportError>,
    ) -> Option<MessageId> {
        if turn.session != self.session {
            tracing::debug!(
                user_message = turn.user_message.get(),
                "dropping reply for a previous session"
            );
            return None;
        }

        let body = match result {
            Ok(raw) => {
                let content = unwrap_payload(raw);
                let variant = classify(&content);
                tracing::debug!(?variant, mode = turn.mode.as_str(), "reply delivered");
                MessageBody::Delivered(DeliveredReply {
                    content,
                    variant,
                    view_mode: turn.mode,
                    has_report_data: turn.mode == ViewMode::Report,
                    upgrade: UpgradeState::Idle,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "workflow request failed");
                MessageBody::Errored {
                    text: TRANSPORT_APOLOGY.to_string(),
                }
            }
        };

        let id = self.allocate_id();
        self.messages.push(Message {
            id,
            created_at: Utc::now(),
            original_query: Some(turn.query),
            reply_to: Some(turn.user_message),
            body,
        });
        Some(id)
    }

    /// Ask for `mode` on a delivered assistant message.
    pub fn request_view(
        &mut self,
        id: MessageId,
        mode: ViewMode,
    ) -> Result<ViewChange, ConversationError> {
        let session = self.session.clone();
        let ticket = self.next_ticket;
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ConversationError::UnknownMessage(id.get()))?;
        let query = message.original_query.clone().unwrap_or_default();
        let MessageBody::Delivered(reply) = &mut message.body else {
            return Err(ConversationError::NotSwitchable(id.get()));
        };

        if reply.upgrade != UpgradeState::Idle {
            return Err(ConversationError::UpgradeInFlight(id.get()));
        }
        if reply.view_mode == mode {
            return Ok(ViewChange::Unchanged);
        }
        if mode == ViewMode::Chat || reply.has_report_data {
            reply.view_mode = mode;
            return Ok(ViewChange::Switched);
        }

        reply.upgrade = UpgradeState::InFlight { ticket };
        self.next_ticket += 1;
        tracing::info!(message = id.get(), "fetching report view");
        Ok(ViewChange::Upgrade(UpgradeTicket {
            session,
            message: id,
            ticket,
            query,
        }))
    }

    /// Apply the result of an upgrade fetch.
    pub fn complete_upgrade(
        &mut self,
        ticket: UpgradeTicket,
        result: Result<Value, TransportError>,
    ) -> UpgradeOutcome {
        if ticket.session != self.session {
            tracing::debug!(message = ticket.message.get(), "dropping upgrade for a previous session");
            return UpgradeOutcome::Dropped;
        }
        let Some(reply) = self
            .messages
            .iter_mut()
            .find(|m| m.id == ticket.message)
            .and_then(|m| match &mut m.body {
                MessageBody::Delivered(reply) => Some(reply),
                _ => None,
            })
        else {
            return UpgradeOutcome::Dropped;
        };
        if reply.upgrade != (UpgradeState::InFlight { ticket: ticket.ticket }) {
            tracing::debug!(message = ticket.message.get(), "dropping stale upgrade");
            return UpgradeOutcome::Dropped;
        }

        reply.upgrade = UpgradeState::Idle;
        match result {
            Ok(raw) => {
                let content = unwrap_payload(raw);
                reply.variant = classify(&content);
                reply.content = content;
                reply.has_report_data = true;
                reply.view_mode = ViewMode::Report;
                tracing::info!(message = ticket.message.get(), variant = ?reply.variant, "report view loaded");
                UpgradeOutcome::Upgraded
            }
            Err(err) => {
                tracing::warn!(message = ticket.message.get(), error = %err, "report upgrade failed, keeping chat view");
                UpgradeOutcome::Failed
            }
        }
    }

    /// Submit `query`, wait for the workflow and append its reply.
    pub async fn ask<C: Collaborator>(
        &mut self,
        collaborator: &C,
        query: &str,
        mode: ViewMode,
    ) -> Result<MessageId, ConversationError> {
        let turn = self.submit(query, mode)?;
        let user_message = turn.user_message;
        let result = collaborator.send(&turn.request()).await;
        self.deliver(turn, result)
            .ok_or(ConversationError::UnknownMessage(user_message.get()))
    }

    /// Switch a message's view, fetching report data first when needed.
    pub async fn switch_view<C: Collaborator>(
        &mut self,
        collaborator: &C,
        id: MessageId,
        mode: ViewMode,
    ) -> Result<SwitchOutcome, ConversationError> {
        match self.request_view(id, mode)? {
            ViewChange::Unchanged => Ok(SwitchOutcome::Unchanged),
            ViewChange::Switched => Ok(SwitchOutcome::Switched),
            ViewChange::Upgrade(ticket) => {
                let result = collaborator.send(&ticket.request()).await;
                Ok(match self.complete_upgrade(ticket, result) {
                    UpgradeOutcome::Upgraded => SwitchOutcome::Upgraded,
                    UpgradeOutcome::Failed | UpgradeOutcome::Dropped => SwitchOutcome::UpgradeFailed,
                })
            }
        }
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }
}
