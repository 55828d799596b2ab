use thiserror::Error;

use crate::key::PropertyKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// Only JSON objects and arrays (or existing [`ObjectRef`](crate::ObjectRef)s)
    /// can be tracked.
    #[error("value must be an object, got {found}")]
    NotAnObject { found: &'static str },

    /// A strict write was refused by the target.
    #[error("cannot assign to read only property '{key}'")]
    ReadOnly { key: PropertyKey },
}

/// Name of the JSON kind, used in construction errors.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
