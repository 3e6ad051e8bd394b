use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage key the session id is kept under.
pub const SESSION_KEY: &str = "labour_law_session";

/// Opaque identifier the workflow uses to thread a conversation's memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First dash-separated group, for display.
    pub fn short(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionId;

    #[test]
    fn generated_ids_are_unique_uuids() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn short_form_is_first_group() {
        let id = SessionId::from("1b4e28ba-2fa1-11d2-883f-0016d3cca427".to_string());
        assert_eq!(id.short(), "1b4e28ba");
        assert_eq!(SessionId::from("opaque".to_string()).short(), "opaque");
    }
}
