use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use labourlex_core::error::{SessionError, codes};
use labourlex_core::session::{SESSION_KEY, SessionId};
use serde_json::{Map, Value, json};

pub fn client(timeout: Option<Duration>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default HTTP client");
        reqwest::Client::new()
    })
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    exit_with(codes::CLI_ERROR, message, docs_hint, 1)
}

/// Print a structured error to stderr and exit with `code`.
pub fn exit_with(error: &str, message: &str, docs_hint: Option<&str>, code: i32) -> ! {
    print_error(error, message, docs_hint);
    std::process::exit(code);
}

/// Print a structured error to stderr without exiting.
pub fn print_error(error: &str, message: &str, docs_hint: Option<&str>) {
    eprintln!("{}", to_pretty_json(&error_body(error, message, docs_hint)));
}

fn error_body(error: &str, message: &str, docs_hint: Option<&str>) -> Value {
    let mut err = json!({
        "error": error,
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    err
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn default_session_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("labourlex");
    config_dir.join("session.json")
}

/// Read the stored session id. A missing file or missing key is `None`.
pub fn load_session(path: &Path) -> Result<Option<SessionId>, SessionError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let stored: Map<String, Value> = serde_json::from_str(&data)?;
    Ok(stored
        .get(SESSION_KEY)
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(|id| SessionId::from(id.to_string())))
}

pub fn save_session(path: &Path, session: &SessionId) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut stored = Map::new();
    stored.insert(SESSION_KEY.to_string(), json!(session.as_str()));
    let data = serde_json::to_string_pretty(&stored)?;

    // Write with restricted permissions (0o600)
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data.as_bytes())?;

    Ok(())
}

/// The stored session, or a freshly generated and saved one.
pub fn load_or_create_session(path: &Path) -> Result<SessionId, SessionError> {
    if let Some(session) = load_session(path)? {
        return Ok(session);
    }
    regenerate_session(path)
}

pub fn regenerate_session(path: &Path) -> Result<SessionId, SessionError> {
    let session = SessionId::generate();
    save_session(path, &session)?;
    tracing::debug!(session = %session, path = %path.display(), "stored new session");
    Ok(session)
}

/// Read a saved workflow reply from a file path or stdin (when path is "-").
/// Text that is not JSON is returned as a JSON string.
pub fn read_payload(path: &str) -> Result<Value, String> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?
    };
    Ok(parse_body(&raw))
}

/// Decode a response body, keeping non-JSON text as a string value.
pub fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        error_body, load_or_create_session, load_session, parse_body, regenerate_session, save_session,
    };
    use labourlex_core::error::codes;
    use labourlex_core::session::SessionId;

    #[test]
    fn error_body_carries_code_and_optional_hint() {
        assert_eq!(
            error_body(codes::CONNECTION_ERROR, "could not reach workflow", Some("Check --webhook-url")),
            json!({
                "error": "connection_error",
                "message": "could not reach workflow",
                "docs_hint": "Check --webhook-url"
            })
        );
        assert_eq!(
            error_body(codes::CLI_ERROR, "bad input", None),
            json!({"error": "cli_error", "message": "bad input"})
        );
    }

    #[test]
    fn missing_session_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_session(&dir.path().join("session.json")).unwrap().is_none());
    }

    #[test]
    fn session_roundtrips_under_fixed_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let session = SessionId::from("abc-123".to_string());

        save_session(&path, &session).unwrap();
        assert_eq!(load_session(&path).unwrap(), Some(session));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!({"labour_law_session": "abc-123"}));
    }

    #[test]
    fn load_or_create_is_stable_until_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let first = load_or_create_session(&path).unwrap();
        let again = load_or_create_session(&path).unwrap();
        assert_eq!(first, again);

        let fresh = regenerate_session(&path).unwrap();
        assert_ne!(fresh, first);
        assert_eq!(load_session(&path).unwrap(), Some(fresh));
    }

    #[test]
    fn corrupt_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_session(&path).is_err());
    }

    #[test]
    fn body_parsing_keeps_text_replies() {
        assert_eq!(parse_body("{\"output\": \"x\"}"), json!({"output": "x"}));
        assert_eq!(parse_body("Hello there"), json!("Hello there"));
        assert_eq!(parse_body(""), json!(""));
    }
}
