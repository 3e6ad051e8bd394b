//! Core of the labourlex client: normalizes the workflow's replies, classifies
//! them, renders structured compliance reports and tracks conversation state.

pub mod content;
pub mod conversation;
pub mod error;
pub mod payload;
pub mod references;
pub mod render;
pub mod report;
pub mod session;

pub use content::{Variant, classify};
pub use conversation::{
    Collaborator, CollaboratorRequest, Conversation, Message, MessageId, SwitchOutcome, ViewMode,
};
pub use payload::unwrap_payload;
pub use references::{Reference, resolve_references};
pub use render::{render_content, render_message};
pub use session::SessionId;
