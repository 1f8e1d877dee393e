//! Tools discovered at run time from a provider.

use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::schema::ToolParameters;
use super::tool::{Tool, ToolContext, ToolOutput};
use crate::error::BraidError;

/// Description of a provider-hosted tool.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicTool {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// Source of tools listed fresh for every request.
#[async_trait]
pub trait DynamicToolProvider: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<DynamicTool>, BraidError>;

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, BraidError>;
}

/// Presents one provider-hosted tool through [`Tool`].
pub struct DynamicToolAdapter {
    provider: Arc<dyn DynamicToolProvider>,
    tool: DynamicTool,
}

impl DynamicToolAdapter {
    pub fn new(provider: Arc<dyn DynamicToolProvider>, tool: DynamicTool) -> Self {
        Self { provider, tool }
    }
}

#[async_trait]
impl Tool for DynamicToolAdapter {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        &self.tool.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.tool.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, BraidError> {
        self.provider.execute_tool(&self.tool.name, args, ctx).await
    }
}

/// List every provider's tools as [`Tool`] objects.
///
/// A failing provider is logged and contributes nothing.
pub async fn collect_dynamic_tools(
    providers: &[Arc<dyn DynamicToolProvider>],
) -> Vec<Arc<dyn Tool>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    for provider in providers {
        match provider.list_tools().await {
            Ok(listed) => tools.extend(listed.into_iter().map(|tool| {
                Arc::new(DynamicToolAdapter::new(provider.clone(), tool)) as Arc<dyn Tool>
            })),
            Err(err) => tracing::warn!(error = %err, "dynamic tool provider failed to list tools"),
        }
    }
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DynamicToolProvider for RecordingProvider {
        async fn list_tools(&self) -> Result<Vec<DynamicTool>, BraidError> {
            Ok(vec![DynamicTool {
                name: "remote_search".into(),
                description: "Search remotely".into(),
                parameters: ToolParameters::empty(),
            }])
        }

        async fn execute_tool(
            &self,
            name: &str,
            _args: &ToolArguments,
            _ctx: &ToolContext,
        ) -> Result<ToolOutput, BraidError> {
            self.calls.lock().unwrap().push(name.to_string());
            Ok(json!({ "hits": 0 }).into())
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl DynamicToolProvider for BrokenProvider {
        async fn list_tools(&self) -> Result<Vec<DynamicTool>, BraidError> {
            Err(BraidError::Stream("connection reset".into()))
        }

        async fn execute_tool(
            &self,
            name: &str,
            _args: &ToolArguments,
            _ctx: &ToolContext,
        ) -> Result<ToolOutput, BraidError> {
            Err(BraidError::tool(name, "unreachable"))
        }
    }

    #[tokio::test]
    async fn adapters_delegate_to_their_provider() {
        let provider = Arc::new(RecordingProvider::default());
        let providers: Vec<Arc<dyn DynamicToolProvider>> =
            vec![provider.clone(), Arc::new(BrokenProvider)];
        let tools = collect_dynamic_tools(&providers).await;
        assert_eq!(tools.len(), 1);

        let ctx = ToolContext::new(Arc::new(Session::new("app", "u", "s")), "inv", "a", "c1");
        let output = tools[0]
            .execute(&ToolArguments::default(), &ctx)
            .await
            .unwrap();
        assert_eq!(output.value["hits"], 0);
        assert_eq!(*provider.calls.lock().unwrap(), vec!["remote_search"]);
    }
}
