//! Structural agents that only orchestrate their children.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::tree::AgentScope;
use super::{Agent, EventStream};

/// Runs each child once, in order.
#[derive(Debug, Clone)]
pub struct SequentialAgent {
    name: String,
    description: String,
}

impl SequentialAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Agent for SequentialAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn run(self: Arc<Self>, scope: AgentScope) -> EventStream {
        Box::pin(async_stream::stream! {
            for child in scope.children().to_vec() {
                let mut events = scope.run_agent(child, scope.ctx.clone());
                while let Some(item) = events.next().await {
                    let failed = item.is_err();
                    yield item;
                    if failed {
                        return;
                    }
                }
            }
        })
    }
}

/// Repeats its children until one escalates or the iteration cap is hit.
#[derive(Debug, Clone)]
pub struct LoopAgent {
    name: String,
    description: String,
    max_iterations: Option<usize>,
}

impl LoopAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            max_iterations: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}

impl Agent for LoopAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn run(self: Arc<Self>, scope: AgentScope) -> EventStream {
        Box::pin(async_stream::stream! {
            let children = scope.children().to_vec();
            if children.is_empty() {
                return;
            }
            let mut iteration = 0usize;
            loop {
                if self.max_iterations.is_some_and(|max| iteration >= max) {
                    tracing::debug!(agent = %self.name, iteration, "loop iteration cap reached");
                    return;
                }
                iteration += 1;
                for child in &children {
                    let mut events = scope.run_agent(*child, scope.ctx.clone());
                    while let Some(item) = events.next().await {
                        let stop = match &item {
                            Ok(event) => event.actions.escalate,
                            Err(_) => true,
                        };
                        yield item;
                        if stop {
                            tracing::debug!(agent = %self.name, iteration, "loop exited");
                            return;
                        }
                    }
                }
            }
        })
    }
}

/// Runs every child concurrently on its own branch.
///
/// Events from different children interleave in arrival order; each child's
/// own order is preserved.
#[derive(Debug, Clone)]
pub struct ParallelAgent {
    name: String,
    description: String,
}

impl ParallelAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

struct AbortOnDrop(Vec<JoinHandle<()>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

impl Agent for ParallelAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn run(self: Arc<Self>, scope: AgentScope) -> EventStream {
        Box::pin(async_stream::stream! {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut handles = Vec::new();
            for child in scope.children().to_vec() {
                let child_name = scope.tree.name(child);
                let branch = match scope.ctx.branch() {
                    Some(parent) => format!("{parent}.{}.{child_name}", self.name),
                    None => format!("{}.{child_name}", self.name),
                };
                let mut events = scope.run_agent(child, scope.ctx.with_branch(branch));
                let tx = tx.clone();
                handles.push(tokio::spawn(async move {
                    while let Some(item) = events.next().await {
                        if tx.send(item).is_err() {
                            break;
                        }
                    }
                }));
            }
            drop(tx);
            let _guard = AbortOnDrop(handles);

            let mut merged = UnboundedReceiverStream::new(rx);
            while let Some(item) = merged.next().await {
                let failed = item.is_err();
                yield item;
                if failed {
                    return;
                }
            }
        })
    }
}
