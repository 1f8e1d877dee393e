//! Per-invocation context shared by every agent an invocation reaches.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::BraidError;
use crate::session::{Session, SessionState};
use crate::types::{Content, Event};

/// Default cap on model calls per invocation.
pub const DEFAULT_MAX_LLM_CALLS: u64 = 500;

/// How model output is delivered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StreamingMode {
    /// One full response per model call.
    #[default]
    None,
    /// Incremental fragments, surfaced as partial events.
    Sse,
}

/// Knobs for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub streaming_mode: StreamingMode,
    /// Model calls allowed per invocation; 0 disables the cap.
    pub max_llm_calls: u64,
    /// Answer calls to unknown tools with an error response instead of skipping them.
    pub report_unknown_tools: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            streaming_mode: StreamingMode::None,
            max_llm_calls: DEFAULT_MAX_LLM_CALLS,
            report_unknown_tools: false,
        }
    }
}

impl RunConfig {
    pub fn with_streaming_mode(mut self, mode: StreamingMode) -> Self {
        self.streaming_mode = mode;
        self
    }

    pub fn with_max_llm_calls(mut self, limit: u64) -> Self {
        self.max_llm_calls = limit;
        self
    }

    pub fn with_report_unknown_tools(mut self, report: bool) -> Self {
        self.report_unknown_tools = report;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming_mode == StreamingMode::Sse
    }
}

/// Model-call budget shared by every context derived from one invocation.
#[derive(Debug, Default)]
pub struct LlmCallCounter {
    count: AtomicU64,
}

impl LlmCallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Count one call; fails on the call that goes past `limit` (0 = unlimited).
    pub fn increment(&self, limit: u64) -> Result<u64, BraidError> {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if limit > 0 && count > limit {
            return Err(BraidError::LlmCallLimitExceeded { limit });
        }
        Ok(count)
    }
}

/// State carried through one invocation.
///
/// Cloning and the `with_*` derivations share the session, the call counter
/// and the cancellation token.
#[derive(Clone)]
pub struct InvocationContext {
    invocation_id: String,
    session: Arc<Session>,
    branch: Option<String>,
    user_content: Option<Content>,
    llm_calls: Arc<LlmCallCounter>,
    run_config: RunConfig,
    cancel: CancellationToken,
}

impl InvocationContext {
    pub fn new(session: Arc<Session>, run_config: RunConfig) -> Self {
        Self {
            invocation_id: new_invocation_id(),
            session,
            branch: None,
            user_content: None,
            llm_calls: Arc::new(LlmCallCounter::new()),
            run_config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_invocation_id(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = invocation_id.into();
        self
    }

    pub fn with_branch(&self, branch: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.branch = Some(branch.into());
        derived
    }

    pub fn with_user_content(&self, content: Content) -> Self {
        let mut derived = self.clone();
        derived.user_content = Some(content);
        derived
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn user_content(&self) -> Option<&Content> {
        self.user_content.as_ref()
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn llm_call_count(&self) -> u64 {
        self.llm_calls.count()
    }

    /// Charge one model call against the shared budget.
    pub fn increment_llm_calls(&self) -> Result<u64, BraidError> {
        self.llm_calls.increment(self.run_config.max_llm_calls)
    }

    /// New event for this invocation and branch.
    pub fn event(&self, author: &str) -> Event {
        Event::new(self.invocation_id.clone(), author).with_branch(self.branch.clone())
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("invocation_id", &self.invocation_id)
            .field("session_id", &self.session.id())
            .field("branch", &self.branch)
            .field("llm_calls", &self.llm_calls.count())
            .field("run_config", &self.run_config)
            .finish()
    }
}

pub fn new_invocation_id() -> String {
    format!("e-{}", Uuid::new_v4())
}
