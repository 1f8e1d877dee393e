//! Top-level entry point: one call per user turn.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::agent::{router, AgentId, AgentTree, EventStream, InvocationContext, RunConfig};
use crate::compaction::CompactionService;
use crate::error::BraidError;
use crate::session::{Session, SessionService};
use crate::types::{Content, Event, EventActions, USER_AUTHOR};

/// Drives an agent tree against sessions held by a [`SessionService`].
#[derive(Clone)]
pub struct Runner {
    app_name: String,
    tree: Arc<AgentTree>,
    sessions: Arc<dyn SessionService>,
    compaction: Option<Arc<CompactionService>>,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        tree: Arc<AgentTree>,
        sessions: Arc<dyn SessionService>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            tree,
            sessions,
            compaction: None,
        }
    }

    pub fn with_compaction(mut self, compaction: Arc<CompactionService>) -> Self {
        self.compaction = Some(compaction);
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn tree(&self) -> &Arc<AgentTree> {
        &self.tree
    }

    pub fn sessions(&self) -> &Arc<dyn SessionService> {
        &self.sessions
    }

    /// Run one user turn.
    pub fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
        run_config: RunConfig,
    ) -> EventStream {
        self.run_with_cancel(
            user_id,
            session_id,
            message,
            run_config,
            CancellationToken::new(),
        )
    }

    /// Run one user turn; cancelling `cancel` interrupts in-flight tools and
    /// ends the stream at the next model or tool boundary.
    pub fn run_with_cancel(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
        run_config: RunConfig,
        cancel: CancellationToken,
    ) -> EventStream {
        let runner = self.clone();
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();
        Box::pin(async_stream::stream! {
            let session = match runner
                .sessions
                .get_session(&runner.app_name, &user_id, &session_id)
                .await
            {
                Ok(session) => session,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let ctx = InvocationContext::new(session.clone(), run_config).with_cancel(cancel);
            let user_event = ctx.event(USER_AUTHOR).with_content(message.clone());
            session.append_event(user_event);
            let ctx = ctx.with_user_content(message);

            let agent_id = runner.select_agent(&session);
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                session_id = %session.id(),
                agent = %runner.tree.name(agent_id),
                "invocation started"
            );

            let mut failed = false;
            let mut events = router::run(runner.tree.clone(), agent_id, ctx.clone());
            while let Some(item) = events.next().await {
                failed |= item.is_err();
                yield item;
            }
            drop(events);

            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                llm_calls = ctx.llm_call_count(),
                failed,
                "invocation finished"
            );
            if !failed && !ctx.is_canceled() {
                runner.compact(&session).await;
            }
        })
    }

    /// Hide `invocation_id` and everything after it from future history.
    ///
    /// State written by the rewound invocations is left as is.
    pub async fn rewind(
        &self,
        user_id: &str,
        session_id: &str,
        invocation_id: &str,
    ) -> Result<Event, BraidError> {
        let session = self
            .sessions
            .get_session(&self.app_name, user_id, session_id)
            .await?;
        if !session
            .events()
            .iter()
            .any(|event| event.invocation_id == invocation_id)
        {
            return Err(BraidError::InvalidArgument(format!(
                "invocation '{invocation_id}' is not in session '{session_id}'"
            )));
        }

        let marker = Event::new(crate::agent::context::new_invocation_id(), USER_AUTHOR)
            .with_actions(EventActions {
                rewind_before_invocation_id: Some(invocation_id.to_string()),
                ..Default::default()
            });
        session.append_event(marker.clone());
        tracing::debug!(session_id, invocation_id, "session rewound");
        self.compact(&session).await;
        Ok(marker)
    }

    /// The latest author that can hold the conversation keeps it; anything
    /// under a workflow agent hands the turn back to the root.
    fn select_agent(&self, session: &Session) -> AgentId {
        session
            .events()
            .iter()
            .rev()
            .filter(|event| event.author != USER_AUTHOR)
            .filter_map(|event| self.tree.find(&event.author))
            .find(|id| self.tree.holds_conversation(*id))
            .unwrap_or_else(|| self.tree.root())
    }

    async fn compact(&self, session: &Session) {
        let Some(compaction) = &self.compaction else {
            return;
        };
        if let Err(err) = compaction.maybe_compact(session).await {
            tracing::warn!(session_id = %session.id(), error = %err, "compaction failed");
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("app_name", &self.app_name)
            .field("tree", &self.tree)
            .field("compaction", &self.compaction.is_some())
            .finish()
    }
}
