//! Assembles the model request for one turn.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::history::{self, HistoryScope};
use super::instruction;
use crate::agent::{AgentScope, LlmAgent};
use crate::model::ModelRequest;
use crate::tools::{collect_dynamic_tools, Tool, TransferToAgentTool};

/// Pure rewrite of a request.
pub type RequestTransformFn = dyn Fn(ModelRequest) -> ModelRequest + Send + Sync;

/// A named request rewrite; lower priorities run first, ties keep insertion order.
#[derive(Clone)]
pub struct RequestTransform {
    pub name: String,
    pub priority: i32,
    apply: Arc<RequestTransformFn>,
}

impl RequestTransform {
    pub fn new<F>(name: impl Into<String>, priority: i32, apply: F) -> Self
    where
        F: Fn(ModelRequest) -> ModelRequest + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            priority,
            apply: Arc::new(apply),
        }
    }

    pub fn apply(&self, request: ModelRequest) -> ModelRequest {
        (self.apply)(request)
    }
}

impl fmt::Debug for RequestTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTransform")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Run transforms in ascending priority.
pub fn apply_transforms(mut request: ModelRequest, transforms: &[RequestTransform]) -> ModelRequest {
    let mut ordered: Vec<&RequestTransform> = transforms.iter().collect();
    ordered.sort_by_key(|transform| transform.priority);
    for transform in ordered {
        request = transform.apply(request);
    }
    request
}

/// Whether the agent is offered `transfer_to_agent` this turn.
pub(crate) fn offers_transfer(agent: &LlmAgent, scope: &AgentScope) -> bool {
    !agent.disallow_transfer && !scope.children().is_empty()
}

/// Configured tools, then the transfer tool, then provider tools.
/// The first tool registered under a name wins.
pub async fn effective_tools(agent: &LlmAgent, scope: &AgentScope) -> Vec<Arc<dyn Tool>> {
    let mut candidates: Vec<Arc<dyn Tool>> = agent.tools.clone();
    if offers_transfer(agent, scope) {
        candidates.push(Arc::new(TransferToAgentTool::new()));
    }
    candidates.extend(collect_dynamic_tools(&agent.tool_providers).await);

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|tool| {
            let fresh = seen.insert(tool.name().to_string());
            if !fresh {
                tracing::debug!(agent = %agent.name, tool = %tool.name(), "duplicate tool name ignored");
            }
            fresh
        })
        .collect()
}

/// Build the request for the next model call.
pub fn build_request(agent: &LlmAgent, scope: &AgentScope, tools: &[Arc<dyn Tool>]) -> ModelRequest {
    let ctx = &scope.ctx;
    let mut request = ModelRequest {
        tools: tools.iter().map(|tool| tool.declaration()).collect(),
        tool_choice: agent.tool_choice,
        settings: agent.settings.clone(),
        ..Default::default()
    };

    let state = ctx.state().to_map();
    request.append_instruction(&instruction::render(&agent.instruction, &state));
    if offers_transfer(agent, scope) {
        request.append_instruction(&instruction::transfer_instruction(&scope.child_summaries()));
    }

    let events = ctx.session().events();
    request.contents = history::build_contents(
        &events,
        HistoryScope {
            agent_name: &agent.name,
            branch: ctx.branch(),
            invocation_id: ctx.invocation_id(),
            user_content: ctx.user_content(),
        },
    );

    apply_transforms(request, &agent.request_transforms)
}
