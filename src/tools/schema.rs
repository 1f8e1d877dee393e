//! JSON-schema parameter declarations for tools.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::validation;

/// Parameter schema of a tool, a JSON Schema object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    pub schema: Value,
}

impl ToolParameters {
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Object schema with no properties.
    pub fn empty() -> Self {
        Self::object().build()
    }

    pub fn object() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Check arguments against this schema.
    pub fn validate(&self, args: &Value) -> Result<(), String> {
        validation::validate_arguments(args, &self.schema)
    }
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder for object schemas.
#[derive(Debug, Default)]
pub struct ParametersBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParametersBuilder {
    fn insert(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn string(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.insert(
            name,
            json!({ "type": "string", "description": description }),
            required,
        )
    }

    pub fn integer(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.insert(
            name,
            json!({ "type": "integer", "description": description }),
            required,
        )
    }

    pub fn number(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.insert(
            name,
            json!({ "type": "number", "description": description }),
            required,
        )
    }

    pub fn boolean(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.insert(
            name,
            json!({ "type": "boolean", "description": description }),
            required,
        )
    }

    /// String restricted to `values`.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: &str,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.insert(
            name,
            json!({ "type": "string", "description": description, "enum": values }),
            required,
        )
    }

    /// Array whose items follow `items`.
    pub fn array(
        self,
        name: impl Into<String>,
        description: &str,
        items: Value,
        required: bool,
    ) -> Self {
        self.insert(
            name,
            json!({ "type": "array", "description": description, "items": items }),
            required,
        )
    }

    /// Arbitrary property schema.
    pub fn property(self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        self.insert(name, schema, required)
    }

    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
