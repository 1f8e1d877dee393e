//! The auto-injected `transfer_to_agent` tool.

use async_trait::async_trait;
use serde_json::json;

use super::arguments::ToolArguments;
use super::schema::ToolParameters;
use super::tool::{Tool, ToolContext, ToolOutput};
use crate::error::BraidError;

pub const TRANSFER_TOOL_NAME: &str = "transfer_to_agent";

/// Requests a hand-off to another agent by name.
///
/// Name resolution happens in the router; this tool only records the request.
#[derive(Debug, Clone)]
pub struct TransferToAgentTool {
    parameters: ToolParameters,
}

impl TransferToAgentTool {
    pub fn new() -> Self {
        Self {
            parameters: ToolParameters::object()
                .string("agent_name", "Name of the agent to transfer to", true)
                .build(),
        }
    }
}

impl Default for TransferToAgentTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TransferToAgentTool {
    fn name(&self) -> &str {
        TRANSFER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Transfer the conversation to another agent better suited to answer."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, BraidError> {
        let target = args.get_str("agent_name")?;
        Ok(ToolOutput::new(json!({})).transfer_to(target))
    }
}
