//! The turn loop: build request, await model, run tools, repeat or finish.

use std::sync::Arc;

use serde_json::json;

use super::llm_phase::{self, ResponseAssembler};
use super::{request, tool_phase};
use crate::agent::{AgentScope, EventStream, InvocationContext, LlmAgent};
use crate::error::BraidError;
use crate::model::ModelResponse;
use crate::types::Event;

/// Drive `agent` until it answers, hands off, escalates or fails.
///
/// Every non-partial event is committed to the session before it is yielded,
/// so the next request always sees the previous round's calls and responses.
pub fn run(agent: Arc<LlmAgent>, scope: AgentScope) -> EventStream {
    Box::pin(async_stream::stream! {
        let ctx = scope.ctx.clone();
        let name = agent.name.clone();
        let streaming = ctx.run_config().is_streaming();
        let mut turn = 0usize;

        loop {
            turn += 1;
            let tools = request::effective_tools(&agent, &scope).await;
            let model_request = request::build_request(&agent, &scope, &tools);

            if ctx.is_canceled() {
                yield Err(BraidError::Canceled);
                return;
            }
            if let Err(err) = llm_phase::charge_llm_call(&ctx, &name) {
                yield Err(err);
                return;
            }

            let response = if streaming {
                let opened =
                    llm_phase::open_stream(agent.model.as_ref(), &model_request, ctx.cancel_token())
                        .await;
                let mut stream = match opened {
                    Ok(stream) => stream,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                let mut assembler = ResponseAssembler::default();
                while let Some(fragment) =
                    llm_phase::next_fragment(&mut stream, ctx.cancel_token()).await
                {
                    match fragment {
                        Ok(fragment) => {
                            if let Some(content) = assembler.absorb(fragment) {
                                yield Ok(ctx.event(&name).with_content(content).with_partial(true));
                            }
                        }
                        Err(err) => {
                            yield Err(err);
                            return;
                        }
                    }
                }
                assembler.finish()
            } else {
                match llm_phase::generate(agent.model.as_ref(), &model_request, ctx.cancel_token())
                    .await
                {
                    Ok(response) => response,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            };

            let mut calls = response.function_calls.clone();
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                agent = %name,
                turn,
                tool_calls = calls.len(),
                text_len = response.text.len(),
                "model turn complete"
            );

            if calls.is_empty() {
                if let Some(event) = finalize(&agent, &ctx, response, streaming) {
                    ctx.session().append_event(event.clone());
                    yield Ok(event);
                }
                return;
            }

            tool_phase::assign_call_ids(&mut calls);
            for (index, call) in calls.iter().enumerate() {
                let preamble = (index == 0).then_some(&response);
                let call_event = tool_phase::call_event(&ctx, &name, call, preamble);
                ctx.session().append_event(call_event.clone());
                yield Ok(call_event);

                let Some(outcome) = tool_phase::execute_call(&ctx, &name, &tools, call).await else {
                    continue;
                };
                let response_event = tool_phase::response_event(&ctx, &name, call, outcome);
                let hands_off = response_event.actions.transfer_target().is_some()
                    || response_event.actions.escalate;
                ctx.session().append_event(response_event.clone());
                yield Ok(response_event);
                if hands_off {
                    return;
                }
            }
        }
    })
}

/// Close a turn that produced no calls.
///
/// Single-shot returns the final event. Streaming already surfaced the text:
/// the assembled response is recorded in the log without being yielded. In
/// both modes the output key travels as the event's state delta.
fn finalize(
    agent: &LlmAgent,
    ctx: &InvocationContext,
    response: ModelResponse,
    streaming: bool,
) -> Option<Event> {
    let mut event = ctx.event(&agent.name).with_content(response.to_content());
    if let Some(key) = agent.output_key.as_deref() {
        event
            .actions
            .state_delta
            .insert(key.to_string(), json!(response.text));
    }
    if let Some(usage) = response.usage.as_ref() {
        event = event.with_metadata("usage", json!(usage));
    }

    if streaming {
        let has_content = event.content.as_ref().is_some_and(|c| !c.parts.is_empty());
        if has_content || !event.actions.state_delta.is_empty() {
            ctx.session().append_event(event);
        }
        return None;
    }
    Some(event)
}
