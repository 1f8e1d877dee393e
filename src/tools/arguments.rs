//! Typed access to function-call arguments.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BraidError;

/// Arguments of one function call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    /// Wrap raw arguments. A JSON-encoded string is decoded first; an empty
    /// string becomes an empty object.
    pub fn new(value: Value) -> Self {
        let value = match value {
            Value::String(raw) => match raw.trim() {
                "" => Value::Object(Default::default()),
                trimmed => serde_json::from_str(trimmed).unwrap_or(Value::String(raw)),
            },
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Self { value }
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    pub fn into_inner(self) -> Value {
        self.value
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    fn missing(kind: &str, key: &str) -> BraidError {
        BraidError::InvalidArgument(format!("missing {kind} argument '{key}'"))
    }

    pub fn get_str(&self, key: &str) -> Result<&str, BraidError> {
        self.get_str_opt(key)
            .ok_or_else(|| Self::missing("string", key))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, BraidError> {
        self.field(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| Self::missing("integer", key))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, BraidError> {
        self.field(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| Self::missing("number", key))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, BraidError> {
        self.field(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| Self::missing("boolean", key))
    }

    /// Deserialize all arguments into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, BraidError> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| BraidError::InvalidArgument(format!("invalid arguments: {e}")))
    }
}

impl From<Value> for ToolArguments {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
