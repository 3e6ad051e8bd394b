use serde::Serialize;
use serde_json::Value;

pub const ABUSIVE_OR_HARMFUL: &str = "abusive_or_harmful";
pub const GREETING_OR_GENERAL: &str = "greeting_or_general";

/// Shown when a safety refusal arrives without its own wording.
pub const SAFETY_FALLBACK: &str =
    "I cannot respond to this query as it violates our safety policies.";

/// Keys whose presence marks a reply as a structured report.
const REPORT_KEYS: [&str; 3] = ["answer", "key_points", "bare_act"];

/// Display category of a canonical reply. Every canonical value maps to
/// exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    AbusiveOrHarmful,
    GreetingOrGeneral,
    StructuredReport,
    Plain,
}

/// Classify canonical content, in priority order: safety refusal, greeting,
/// structured report, plain.
pub fn classify(content: &Value) -> Variant {
    let Some(record) = content.as_object() else {
        return Variant::Plain;
    };

    match record.get("type").and_then(Value::as_str) {
        Some(ABUSIVE_OR_HARMFUL) => return Variant::AbusiveOrHarmful,
        Some(GREETING_OR_GENERAL) => return Variant::GreetingOrGeneral,
        _ => {}
    }

    if REPORT_KEYS
        .iter()
        .any(|key| record.get(*key).is_some_and(|v| v.has_content()))
    {
        Variant::StructuredReport
    } else {
        Variant::Plain
    }
}

/// Presence test used to gate report sections.
///
/// Null, blank strings, empty lists, `false` and zero are absent; a record is
/// present when any of its fields is.
pub trait HasContent {
    fn has_content(&self) -> bool;
}

impl HasContent for Value {
    fn has_content(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => s.has_content(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => map.values().any(HasContent::has_content),
        }
    }
}

impl HasContent for str {
    fn has_content(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl HasContent for String {
    fn has_content(&self) -> bool {
        self.as_str().has_content()
    }
}

impl<T: HasContent> HasContent for Option<T> {
    fn has_content(&self) -> bool {
        self.as_ref().is_some_and(HasContent::has_content)
    }
}

impl<T: HasContent> HasContent for [T] {
    fn has_content(&self) -> bool {
        self.iter().any(HasContent::has_content)
    }
}

impl<T: HasContent> HasContent for Vec<T> {
    fn has_content(&self) -> bool {
        self.as_slice().has_content()
    }
}

/// Text of a record's `answer` field, if it is a string.
pub fn answer_text(content: &Value) -> Option<&str> {
    content.get("answer").and_then(Value::as_str)
}

/// Plain bubble text: strings verbatim, anything else as compact JSON.
pub fn plain_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
