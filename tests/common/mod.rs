//! Shared test helpers and a scripted model.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use braid::agent::{router, AgentTree, EventStream, InvocationContext, RunConfig};
use braid::error::BraidError;
use braid::model::{Model, ModelRequest, ModelResponse, ModelStream};
use braid::session::Session;
use braid::types::*;

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Full(ModelResponse),
    Fragments(Vec<ModelResponse>),
    Fail(String),
}

/// A model that answers from a queue and records every request.
///
/// An exhausted queue answers "done".
pub struct ScriptedModel {
    name: String,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn queue(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Queue a text response.
    pub fn queue_text(&self, text: &str) -> &Self {
        self.queue(Reply::Full(ModelResponse::text(text)))
    }

    /// Queue a single tool call.
    pub fn queue_call(&self, id: &str, name: &str, args: serde_json::Value) -> &Self {
        self.queue(Reply::Full(ModelResponse::function_call(
            FunctionCall::new(name, args).with_id(id),
        )))
    }

    /// Queue a streamed text response, one fragment per chunk.
    pub fn queue_fragments(&self, chunks: &[&str]) -> &Self {
        self.queue(Reply::Fragments(
            chunks
                .iter()
                .map(|chunk| ModelResponse {
                    text: chunk.to_string(),
                    ..Default::default()
                })
                .collect(),
        ))
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, request: &ModelRequest) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Full(ModelResponse::text("done")))
    }
}

#[async_trait]
impl Model for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, BraidError> {
        match self.next(request) {
            Reply::Full(response) => Ok(response),
            Reply::Fragments(fragments) => {
                let mut merged = ModelResponse::default();
                for fragment in fragments {
                    merged.text.push_str(&fragment.text);
                    merged.function_calls.extend(fragment.function_calls);
                }
                Ok(merged)
            }
            Reply::Fail(message) => Err(BraidError::model(self.name.clone(), message)),
        }
    }

    async fn generate_stream(&self, request: &ModelRequest) -> Result<ModelStream, BraidError> {
        let fragments = match self.next(request) {
            Reply::Full(response) => vec![response],
            Reply::Fragments(fragments) => fragments,
            Reply::Fail(message) => return Err(BraidError::model(self.name.clone(), message)),
        };
        Ok(futures::stream::iter(fragments.into_iter().map(Ok)).boxed())
    }
}

pub fn session() -> Arc<Session> {
    Arc::new(Session::new("app", "user", "session"))
}

/// Context for a top-level invocation whose user message is already logged.
pub fn context(session: &Arc<Session>, text: &str, run_config: RunConfig) -> InvocationContext {
    let ctx = InvocationContext::new(session.clone(), run_config);
    let message = Content::user(text);
    session.append_event(ctx.event(USER_AUTHOR).with_content(message.clone()));
    ctx.with_user_content(message)
}

pub async fn collect(mut stream: EventStream) -> Vec<Result<Event, BraidError>> {
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
    }
    items
}

/// Collect a run that must not fail.
pub async fn collect_ok(stream: EventStream) -> Vec<Event> {
    collect(stream)
        .await
        .into_iter()
        .map(|item| item.expect("run failed"))
        .collect()
}

/// Run the tree's root through the router.
pub async fn run_root(tree: &Arc<AgentTree>, ctx: InvocationContext) -> Vec<Event> {
    collect_ok(router::run(tree.clone(), tree.root(), ctx)).await
}

pub fn authors(events: &[Event]) -> Vec<&str> {
    events.iter().map(|event| event.author.as_str()).collect()
}

/// Compact description of an event for order assertions.
pub fn describe(event: &Event) -> String {
    if let Some(call) = event.function_calls().first() {
        return format!("call({})", call.id.as_deref().unwrap_or_default());
    }
    if let Some(response) = event.function_responses().first() {
        return format!(
            "response({},{})",
            response.id.as_deref().unwrap_or_default(),
            response.response
        );
    }
    if event.error_message.is_some() {
        return "error".to_string();
    }
    format!("text({})", event.text())
}
