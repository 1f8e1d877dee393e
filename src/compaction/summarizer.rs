//! Summarizers condense a window of events into text.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BraidError;
use crate::model::{Model, ModelRequest};
use crate::types::{Content, Event, Part};

/// Turns a range of events into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, events: &[Event]) -> Result<String, BraidError>;
}

const DEFAULT_PROMPT: &str = "Summarize the conversation below so it can replace the original \
turns as context for later requests. Keep the user's goals, decisions, facts learned from tools \
and open questions. Write in plain prose without preamble.";

/// One line per part, prefixed with the author.
pub fn render_transcript(events: &[Event]) -> String {
    let mut lines = Vec::new();
    for event in events {
        let Some(content) = event.content.as_ref() else {
            continue;
        };
        let author = &event.author;
        for part in &content.parts {
            match part {
                Part::Text { text } if !text.is_empty() => {
                    lines.push(format!("[{author}] {text}"));
                }
                Part::FunctionCall(call) => {
                    lines.push(format!("[{author}.tool_call] {} {}", call.name, call.args));
                }
                Part::FunctionResponse(response) => {
                    lines.push(format!(
                        "[{author}.tool_result] {} {}",
                        response.name, response.response
                    ));
                }
                Part::InlineData(blob) => {
                    lines.push(format!("[{author}] <{} omitted>", blob.mime_type));
                }
                Part::Text { .. } | Part::Reasoning { .. } => {}
            }
        }
    }
    lines.join("\n")
}

/// Asks a model to write the summary.
pub struct ModelSummarizer {
    model: Arc<dyn Model>,
    prompt: String,
}

impl ModelSummarizer {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(&self, events: &[Event]) -> Result<String, BraidError> {
        let request = ModelRequest {
            system_instruction: Some(self.prompt.clone()),
            contents: vec![Content::user(render_transcript(events))],
            ..Default::default()
        };
        let response = self.model.generate(&request).await?;
        let summary = response.text.trim();
        if summary.is_empty() {
            return Err(BraidError::model(
                self.model.name(),
                "summarizer returned an empty summary",
            ));
        }
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionCall, FunctionResponse, Role};
    use serde_json::json;

    #[test]
    fn transcript_lists_text_calls_and_results() {
        let events = vec![
            Event::new("inv", "user").with_content(Content::user("what is 6*7?")),
            Event::new("inv", "calc").with_content(Content::new(
                Role::Model,
                vec![
                    Part::reasoning("multiply"),
                    Part::FunctionCall(FunctionCall::new("mul", json!({ "a": 6, "b": 7 }))),
                ],
            )),
            Event::new("inv", "calc").with_content(Content::new(
                Role::Tool,
                vec![Part::FunctionResponse(FunctionResponse {
                    id: None,
                    name: "mul".into(),
                    response: json!({ "value": 42 }),
                    error: None,
                })],
            )),
        ];
        assert_eq!(
            render_transcript(&events),
            "[user] what is 6*7?\n[calc.tool_call] mul {\"a\":6,\"b\":7}\n[calc.tool_result] mul {\"value\":42}"
        );
    }
}
