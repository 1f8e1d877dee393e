//! Model-backed agent driven by the turn engine.

use std::fmt;
use std::sync::Arc;

use super::tree::AgentScope;
use super::{Agent, EventStream};
use crate::agent_loop::{self, RequestTransform};
use crate::model::Model;
use crate::tools::{DynamicToolProvider, Tool};
use crate::types::{GenerationSettings, ToolChoice};

/// An agent that reasons with a model and calls tools.
///
/// ```
/// # use std::sync::Arc;
/// # use braid::agent::LlmAgent;
/// # fn demo(model: Arc<dyn braid::model::Model>) {
/// let agent = LlmAgent::new("support", model)
///     .with_description("Answers product questions")
///     .with_instruction("You help {user:name?} with {product}.")
///     .with_output_key("last_answer");
/// # let _ = agent;
/// # }
/// ```
#[derive(Clone)]
pub struct LlmAgent {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) model: Arc<dyn Model>,
    pub(crate) instruction: String,
    pub(crate) tools: Vec<Arc<dyn Tool>>,
    pub(crate) tool_providers: Vec<Arc<dyn DynamicToolProvider>>,
    pub(crate) output_key: Option<String>,
    pub(crate) settings: GenerationSettings,
    pub(crate) tool_choice: ToolChoice,
    pub(crate) disallow_transfer: bool,
    pub(crate) request_transforms: Vec<RequestTransform>,
}

impl LlmAgent {
    pub fn new(name: impl Into<String>, model: Arc<dyn Model>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            model,
            instruction: String::new(),
            tools: Vec::new(),
            tool_providers: Vec::new(),
            output_key: None,
            settings: GenerationSettings::default(),
            tool_choice: ToolChoice::default(),
            disallow_transfer: false,
            request_transforms: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Instruction template; `{key}` and `{key?}` are filled from state.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_tool_provider(mut self, provider: Arc<dyn DynamicToolProvider>) -> Self {
        self.tool_providers.push(provider);
        self
    }

    /// Store the final response text in session state under `key`.
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    /// Do not offer `transfer_to_agent` even when the agent has children.
    pub fn with_disallow_transfer(mut self, disallow: bool) -> Self {
        self.disallow_transfer = disallow;
        self
    }

    pub fn with_request_transform(mut self, transform: RequestTransform) -> Self {
        self.request_transforms.push(transform);
        self
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }
}

impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_transfer_capable(&self) -> bool {
        true
    }

    fn run(self: Arc<Self>, scope: AgentScope) -> EventStream {
        agent_loop::run(self, scope)
    }
}

impl fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("LlmAgent")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("tools", &tools)
            .field("output_key", &self.output_key)
            .finish()
    }
}
