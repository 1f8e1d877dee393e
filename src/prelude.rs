//! Convenience re-exports for common use.

pub use crate::agent::{
    Agent, AgentNode, AgentTree, EventStream, InvocationContext, LlmAgent, LoopAgent,
    ParallelAgent, RunConfig, SequentialAgent, StreamingMode,
};
pub use crate::compaction::{CompactionConfig, CompactionService, ModelSummarizer, Summarizer};
pub use crate::config::BraidConfig;
pub use crate::error::{BraidError, Result};
pub use crate::model::{Model, ModelRequest, ModelResponse};
pub use crate::runner::Runner;
pub use crate::session::{InMemorySessionService, Session, SessionService, StateMap};
pub use crate::tools::{FunctionTool, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters};
pub use crate::types::{Content, Event, EventActions, FunctionCall, GenerationSettings, Part, Role};
