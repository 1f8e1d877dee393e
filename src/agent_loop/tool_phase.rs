//! Tool half of a turn: call events, dispatch, response events.

use std::sync::Arc;

use uuid::Uuid;

use crate::agent::InvocationContext;
use crate::model::ModelResponse;
use crate::tools::{dispatch, Tool, ToolContext, ToolOutcome};
use crate::types::{Content, Event, FunctionCall, FunctionResponse, Part, Role};

/// Give every call an id; generated ids look like `call_<uuid>`.
pub(super) fn assign_call_ids(calls: &mut [FunctionCall]) {
    for call in calls.iter_mut() {
        if call.id.as_deref().map_or(true, str::is_empty) {
            call.id = Some(format!("call_{}", Uuid::new_v4().simple()));
        }
    }
}

/// Model event announcing one call. `preamble` carries reasoning and text
/// that arrived with the calls; it is attached to the first call only.
pub(super) fn call_event(
    ctx: &InvocationContext,
    agent: &str,
    call: &FunctionCall,
    preamble: Option<&ModelResponse>,
) -> Event {
    let mut parts = Vec::new();
    if let Some(response) = preamble {
        if !response.reasoning.is_empty() {
            parts.push(Part::reasoning(response.reasoning.clone()));
        }
        if !response.text.is_empty() {
            parts.push(Part::text(response.text.clone()));
        }
    }
    parts.push(Part::FunctionCall(call.clone()));
    ctx.event(agent).with_content(Content::new(Role::Model, parts))
}

/// Tool-role event carrying a call's result and the actions it requested.
pub(super) fn response_event(
    ctx: &InvocationContext,
    agent: &str,
    call: &FunctionCall,
    outcome: ToolOutcome,
) -> Event {
    let response = FunctionResponse {
        id: call.id.clone(),
        name: call.name.clone(),
        error: outcome.error_message().map(str::to_string),
        response: outcome.response,
    };
    ctx.event(agent)
        .with_content(Content::new(
            Role::Tool,
            vec![Part::FunctionResponse(response)],
        ))
        .with_actions(outcome.actions)
}

pub(super) fn find_tool<'a>(tools: &'a [Arc<dyn Tool>], name: &str) -> Option<&'a Arc<dyn Tool>> {
    tools.iter().find(|tool| tool.name() == name)
}

/// Run one call, or report it when the tool is unknown.
///
/// `None` means the call names no tool and unknown tools are skipped.
pub(super) async fn execute_call(
    ctx: &InvocationContext,
    agent: &str,
    tools: &[Arc<dyn Tool>],
    call: &FunctionCall,
) -> Option<ToolOutcome> {
    let Some(tool) = find_tool(tools, &call.name) else {
        tracing::warn!(
            invocation_id = %ctx.invocation_id(),
            agent,
            tool = %call.name,
            "model called unknown tool"
        );
        return ctx
            .run_config()
            .report_unknown_tools
            .then(|| ToolOutcome::unknown_tool(&call.name));
    };

    let tool_ctx = ToolContext::new(
        ctx.session().clone(),
        ctx.invocation_id(),
        agent,
        call.id.clone().unwrap_or_default(),
    )
    .with_branch(ctx.branch().map(str::to_string))
    .with_cancel(ctx.cancel_token().child_token());

    tracing::debug!(
        invocation_id = %ctx.invocation_id(),
        agent,
        tool = %call.name,
        function_call_id = %tool_ctx.function_call_id,
        "executing tool"
    );
    Some(dispatch(tool.as_ref(), call, &tool_ctx).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_ids_are_generated_and_existing_kept() {
        let mut calls = vec![
            FunctionCall::new("a", json!({})).with_id("c1"),
            FunctionCall::new("b", json!({})),
            FunctionCall::new("c", json!({})).with_id(""),
        ];
        assign_call_ids(&mut calls);
        assert_eq!(calls[0].id.as_deref(), Some("c1"));
        assert!(calls[1].id.as_deref().unwrap().starts_with("call_"));
        assert!(calls[2].id.as_deref().unwrap().starts_with("call_"));
        assert_ne!(calls[1].id, calls[2].id);
    }
}
