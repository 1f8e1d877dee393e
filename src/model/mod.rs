//! Model trait consumed by the turn engine.
//!
//! Vendor adapters live outside this crate; they implement [`Model`] over
//! whatever transport they negotiate.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::BraidError;
use crate::types::{
    Content, FinishReason, FunctionCall, GenerationSettings, Part, Role, ToolChoice, Usage,
};

/// Tool declaration sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A request sent to a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub tools: Vec<ToolDeclaration>,
    pub tool_choice: ToolChoice,
    pub settings: GenerationSettings,
}

impl ModelRequest {
    /// Append text to the system instruction, separated by a blank line.
    pub fn append_instruction(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.system_instruction.as_mut() {
            Some(existing) if !existing.is_empty() => {
                existing.push_str("\n\n");
                existing.push_str(text);
            }
            _ => self.system_instruction = Some(text.to_string()),
        }
    }

    /// Names of the declared tools, in declaration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// A full response, or one streamed fragment of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub reasoning: String,
    pub function_calls: Vec<FunctionCall>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_calls: vec![call],
            finish_reason: Some(FinishReason::ToolCalls),
            ..Default::default()
        }
    }

    /// Model-role content in part order: reasoning, text, then calls.
    pub fn to_content(&self) -> Content {
        let mut parts = Vec::new();
        if !self.reasoning.is_empty() {
            parts.push(Part::reasoning(self.reasoning.clone()));
        }
        if !self.text.is_empty() {
            parts.push(Part::text(self.text.clone()));
        }
        parts.extend(
            self.function_calls
                .iter()
                .cloned()
                .map(Part::FunctionCall),
        );
        Content::new(Role::Model, parts)
    }
}

/// Stream of response fragments.
pub type ModelStream = BoxStream<'static, Result<ModelResponse, BraidError>>;

/// Core trait implemented by model adapters.
#[async_trait]
pub trait Model: Send + Sync {
    /// Model name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate one complete response.
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, BraidError>;

    /// Generate a response as a sequence of incremental fragments.
    async fn generate_stream(&self, request: &ModelRequest) -> Result<ModelStream, BraidError>;
}
