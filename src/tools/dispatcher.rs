//! Runs one function call against a resolved tool.
//!
//! Every path yields a function response: argument violations and tool
//! errors become `{"error": ..}`, cancellation becomes `{"interrupted": true}`.

use serde_json::{json, Value};

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolContext};
use crate::types::{EventActions, FunctionCall};

/// Structured result of dispatching one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub response: Value,
    pub actions: EventActions,
    pub is_error: bool,
}

impl ToolOutcome {
    fn ok(response: Value, actions: EventActions) -> Self {
        Self {
            response,
            actions,
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            response: json!({ "error": message.into() }),
            actions: EventActions::default(),
            is_error: true,
        }
    }

    pub fn interrupted() -> Self {
        Self {
            response: json!({ "interrupted": true }),
            actions: EventActions::default(),
            is_error: true,
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::error(format!("tool '{name}' not found"))
    }

    /// The error message, if the response carries one.
    pub fn error_message(&self) -> Option<&str> {
        self.response.get("error").and_then(Value::as_str)
    }
}

/// Function responses must be objects; bare values are wrapped.
fn into_response(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        Value::Null => json!({}),
        other => json!({ "result": other }),
    }
}

pub async fn dispatch(tool: &dyn Tool, call: &FunctionCall, ctx: &ToolContext) -> ToolOutcome {
    if ctx.is_canceled() {
        return ToolOutcome::interrupted();
    }

    let args = ToolArguments::new(call.args.clone());
    if let Err(violation) = tool.parameters().validate(args.raw()) {
        tracing::warn!(
            tool = %call.name,
            function_call_id = %ctx.function_call_id,
            %violation,
            "tool arguments rejected"
        );
        return ToolOutcome::error(format!("invalid arguments: {violation}"));
    }

    let result = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            tracing::debug!(tool = %call.name, "tool interrupted");
            return ToolOutcome::interrupted();
        }
        result = tool.execute(&args, ctx) => result,
    };

    match result {
        Ok(output) => ToolOutcome::ok(into_response(output.value), output.actions),
        Err(err) => {
            tracing::warn!(
                tool = %call.name,
                function_call_id = %ctx.function_call_id,
                error = %err,
                "tool failed"
            );
            ToolOutcome::error(err.to_string())
        }
    }
}
