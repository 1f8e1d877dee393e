//! Agents, the agent tree, and the transfer router.

pub mod context;
pub mod llm;
pub mod router;
pub mod tree;
pub mod workflow;

use std::sync::Arc;

use futures::stream::BoxStream;

use crate::error::BraidError;
use crate::types::Event;

pub use context::{InvocationContext, LlmCallCounter, RunConfig, StreamingMode};
pub use llm::LlmAgent;
pub use tree::{AgentId, AgentNode, AgentScope, AgentTree};
pub use workflow::{LoopAgent, ParallelAgent, SequentialAgent};

/// Lazy sequence of events produced by an agent run.
pub type EventStream = BoxStream<'static, Result<Event, BraidError>>;

/// A node of the agent tree.
///
/// Implementations produce their own events and commit the non-partial ones
/// to the session before yielding them.
pub trait Agent: Send + Sync {
    /// Unique name within the tree; transfer targets refer to it.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether a conversation may stay with this agent from one turn to the
    /// next. Agents that orchestrate their children answer `false`.
    fn is_transfer_capable(&self) -> bool {
        false
    }

    fn run(self: Arc<Self>, scope: AgentScope) -> EventStream;
}
