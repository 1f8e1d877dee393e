//! Tool trait, execution context, and the closure-backed `FunctionTool`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::arguments::ToolArguments;
use super::schema::ToolParameters;
use crate::error::BraidError;
use crate::model::ToolDeclaration;
use crate::session::{Session, SessionState};
use crate::types::EventActions;

/// What a tool sees while it runs.
#[derive(Clone)]
pub struct ToolContext {
    pub invocation_id: String,
    pub function_call_id: String,
    pub agent_name: String,
    pub branch: Option<String>,
    pub session: Arc<Session>,
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(
        session: Arc<Session>,
        invocation_id: impl Into<String>,
        agent_name: impl Into<String>,
        function_call_id: impl Into<String>,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            function_call_id: function_call_id.into(),
            agent_name: agent_name.into(),
            branch: None,
            session,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("invocation_id", &self.invocation_id)
            .field("function_call_id", &self.function_call_id)
            .field("agent_name", &self.agent_name)
            .field("branch", &self.branch)
            .field("session_id", &self.session.id())
            .finish()
    }
}

/// Result value of a tool plus the actions it requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub value: Value,
    pub actions: EventActions,
}

impl ToolOutput {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            actions: EventActions::default(),
        }
    }

    /// Hand control to the named agent once this call's response is recorded.
    pub fn transfer_to(mut self, agent_name: impl Into<String>) -> Self {
        self.actions.transfer_to_agent = Some(agent_name.into());
        self
    }

    pub fn escalate(mut self) -> Self {
        self.actions.escalate = true;
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.actions.state_delta.insert(key.into(), value);
        self
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// A callable capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model calls the tool by.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
        }
    }

    /// Run the tool. Errors are folded into the function response.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, BraidError>;
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolOutput, BraidError>> + Send>>;

type ToolHandler = dyn Fn(ToolArguments, ToolContext) -> ToolFuture + Send + Sync;

/// Tool backed by an async closure.
///
/// ```
/// use braid::tools::{FunctionTool, ToolParameters};
/// use serde_json::json;
///
/// let lookup = FunctionTool::new(
///     "lookup",
///     "Look up a value",
///     ToolParameters::object().string("q", "query", true).build(),
///     |args, _ctx| async move {
///         let q = args.get_str("q")?.to_string();
///         Ok(json!({ "value": q.len() }))
///     },
/// );
/// # let _ = lookup;
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut, O>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, BraidError>> + Send + 'static,
        O: Into<ToolOutput> + 'static,
    {
        let handler = Arc::new(handler);
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| {
                let fut = handler(args, ctx);
                let boxed: ToolFuture = Box::pin(async move { fut.await.map(Into::into) });
                boxed
            }),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, BraidError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
