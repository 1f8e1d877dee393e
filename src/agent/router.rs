//! Runs an agent and acts on the transfer and escalation signals it emits.
//!
//! Only events authored by the running agent are inspected; events relayed
//! from descendants were already handled by their own router frame.

use std::sync::Arc;

use futures::StreamExt;

use super::context::InvocationContext;
use super::tree::{AgentId, AgentScope, AgentTree};
use super::EventStream;
use crate::types::Event;

/// Lazily run `agent_id` with `ctx`.
///
/// A transfer hands the rest of the sequence to the target agent with the
/// same context; the transferring agent is never resumed. An unresolvable
/// target yields one error event. An escalation ends the sequence.
pub fn run(tree: Arc<AgentTree>, agent_id: AgentId, ctx: InvocationContext) -> EventStream {
    Box::pin(async_stream::stream! {
        let agent = tree.agent(agent_id).clone();
        let name = agent.name().to_string();
        tracing::debug!(
            invocation_id = %ctx.invocation_id(),
            agent = %name,
            branch = ?ctx.branch(),
            "agent run started"
        );

        let mut events = agent.run(AgentScope::new(tree.clone(), agent_id, ctx.clone()));
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(err) => {
                    tracing::debug!(agent = %name, error = %err, "agent run failed");
                    yield Err(err);
                    return;
                }
            };

            let own = event.author == name && !event.partial;
            let transfer = own
                .then(|| event.actions.transfer_target().map(str::to_string))
                .flatten();
            let escalate = own && event.actions.escalate;
            yield Ok(event);

            if let Some(target) = transfer {
                drop(events);
                match tree.resolve_transfer(agent_id, &target) {
                    Some(next) => {
                        tracing::debug!(
                            invocation_id = %ctx.invocation_id(),
                            from = %name,
                            to = %target,
                            "transferring"
                        );
                        let mut handoff = run(tree.clone(), next, ctx.clone());
                        while let Some(item) = handoff.next().await {
                            yield item;
                        }
                    }
                    None => {
                        tracing::warn!(
                            invocation_id = %ctx.invocation_id(),
                            agent = %name,
                            target = %target,
                            "transfer target not found"
                        );
                        let error = unresolved_transfer_event(&ctx, &name, &target);
                        ctx.session().append_event(error.clone());
                        yield Ok(error);
                    }
                }
                return;
            }

            if escalate {
                tracing::debug!(agent = %name, "escalated");
                return;
            }
        }
        tracing::debug!(agent = %name, "agent run finished");
    })
}

fn unresolved_transfer_event(ctx: &InvocationContext, author: &str, target: &str) -> Event {
    ctx.event(author)
        .with_error(format!("agent '{target}' not found in the agent tree"))
        .with_metadata("error_code", serde_json::json!("agent_not_found"))
}
