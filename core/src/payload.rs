use serde_json::Value;

/// Nesting levels followed before giving up on a payload.
pub const MAX_UNWRAP_DEPTH: usize = 16;

/// One level of indirection in a workflow reply.
#[derive(Debug, PartialEq)]
enum Layer {
    /// Non-empty array: the payload is its first element
    Sequence(Value),
    /// String holding serialized JSON
    JsonString(Value),
    /// `{"final": ..}` or `{"output": ..}` wrapper
    Envelope(Value),
    /// Nothing left to peel
    Leaf(Value),
}

impl Layer {
    fn peel(value: Value) -> Self {
        match value {
            Value::Array(mut items) if !items.is_empty() => Layer::Sequence(items.swap_remove(0)),
            Value::String(text) => {
                let trimmed = text.trim();
                if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
                    return Layer::Leaf(Value::String(text));
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(parsed) => Layer::JsonString(parsed),
                    Err(_) => Layer::Leaf(Value::String(text)),
                }
            }
            Value::Object(mut map) => {
                if let Some(inner) = map.remove("final") {
                    Layer::Envelope(inner)
                } else if let Some(inner) = map.remove("output") {
                    Layer::Envelope(inner)
                } else {
                    Layer::Leaf(Value::Object(map))
                }
            }
            other => Layer::Leaf(other),
        }
    }
}

/// Collapse a workflow reply into its canonical content.
///
/// Arrays yield their first element, JSON-looking strings are parsed, and
/// `final` / `output` envelopes are opened (`final` wins when both exist),
/// repeatedly until a leaf is reached. Strings that look like JSON but fail to
/// parse are kept as text. After [`MAX_UNWRAP_DEPTH`] steps the value reached
/// so far is returned as-is.
///
/// `unwrap_payload(unwrap_payload(x)) == unwrap_payload(x)` for any payload
/// that unwraps within the depth limit.
pub fn unwrap_payload(value: Value) -> Value {
    let mut current = value;
    for _ in 0..MAX_UNWRAP_DEPTH {
        match Layer::peel(current) {
            Layer::Sequence(inner) | Layer::JsonString(inner) | Layer::Envelope(inner) => {
                current = inner;
            }
            Layer::Leaf(leaf) => return leaf,
        }
    }
    tracing::debug!(
        max_depth = MAX_UNWRAP_DEPTH,
        "payload still nested at unwrap depth limit, using value reached"
    );
    current
}
