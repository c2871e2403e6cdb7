use serde_json::Value;

/// Shape of a JSON value as far as the engine cares.
///
/// `serde_json::Value` can only hold valid JSON, so there is no "invalid"
/// shape to report here; value-shape defects are detected by the rules that
/// expect a particular shape and reported through the validation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Primitive,
    Object,
    Array,
}

pub fn classify(value: &Value) -> ValueKind {
    match value {
        Value::Object(_) => ValueKind::Object,
        Value::Array(_) => ValueKind::Array,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => ValueKind::Primitive,
    }
}

/// Text used when a value is spliced into a string or compared as a string.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Short description for error messages.
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
