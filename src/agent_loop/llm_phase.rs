//! Model-call half of a turn: budget, cancellation and fragment assembly.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::agent::InvocationContext;
use crate::error::BraidError;
use crate::model::{Model, ModelRequest, ModelResponse, ModelStream};
use crate::types::{Content, FunctionCall, Part, Role};

/// Charge the shared budget for one model call.
pub(super) fn charge_llm_call(ctx: &InvocationContext, agent: &str) -> Result<u64, BraidError> {
    let count = ctx.increment_llm_calls().inspect_err(|err| {
        tracing::warn!(
            invocation_id = %ctx.invocation_id(),
            agent,
            error = %err,
            "llm call budget exhausted"
        );
    })?;
    tracing::debug!(
        invocation_id = %ctx.invocation_id(),
        agent,
        llm_calls = count,
        "calling model"
    );
    Ok(count)
}

pub(super) async fn generate(
    model: &dyn Model,
    request: &ModelRequest,
    cancel: &CancellationToken,
) -> Result<ModelResponse, BraidError> {
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(BraidError::Canceled),
        response = model.generate(request) => response?,
    };
    let mut assembled = ResponseAssembler::default();
    assembled.absorb(response);
    Ok(assembled.finish())
}

pub(super) async fn open_stream(
    model: &dyn Model,
    request: &ModelRequest,
    cancel: &CancellationToken,
) -> Result<ModelStream, BraidError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BraidError::Canceled),
        stream = model.generate_stream(request) => stream,
    }
}

/// Next fragment, or `Canceled` if the token fires first.
pub(super) async fn next_fragment(
    stream: &mut ModelStream,
    cancel: &CancellationToken,
) -> Option<Result<ModelResponse, BraidError>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Some(Err(BraidError::Canceled)),
        fragment = stream.next() => fragment,
    }
}

/// Folds fragments into one response.
///
/// Usage keeps the last figure reported. Function calls are keyed by id: a
/// later fragment with a known id replaces that call's arguments. Fragments
/// with neither id nor name are argument deltas with nothing to attach to and
/// are dropped.
#[derive(Debug, Default)]
pub(super) struct ResponseAssembler {
    response: ModelResponse,
}

impl ResponseAssembler {
    /// Fold in one fragment, returning the displayable content it carried.
    pub(super) fn absorb(&mut self, fragment: ModelResponse) -> Option<Content> {
        let mut visible = Vec::new();
        if !fragment.reasoning.is_empty() {
            self.response.reasoning.push_str(&fragment.reasoning);
            visible.push(Part::reasoning(fragment.reasoning));
        }
        if !fragment.text.is_empty() {
            self.response.text.push_str(&fragment.text);
            visible.push(Part::text(fragment.text));
        }
        for call in fragment.function_calls {
            self.absorb_call(call);
        }
        if fragment.finish_reason.is_some() {
            self.response.finish_reason = fragment.finish_reason;
        }
        // Providers report running totals; the latest figure wins.
        if fragment.usage.is_some() {
            self.response.usage = fragment.usage;
        }
        (!visible.is_empty()).then(|| Content::new(Role::Model, visible))
    }

    fn absorb_call(&mut self, call: FunctionCall) {
        let id = call.id.as_deref().filter(|id| !id.is_empty());
        match id {
            Some(id) => {
                let existing = self
                    .response
                    .function_calls
                    .iter_mut()
                    .find(|known| known.id.as_deref() == Some(id));
                match existing {
                    Some(known) => {
                        if !call.name.is_empty() {
                            known.name = call.name;
                        }
                        known.args = call.args;
                    }
                    None if call.name.is_empty() => {
                        tracing::debug!(function_call_id = id, "dropping unnamed call fragment");
                    }
                    None => self.response.function_calls.push(call),
                }
            }
            None if call.name.is_empty() => {
                tracing::debug!("dropping call fragment without id or name");
            }
            None => self.response.function_calls.push(call),
        }
    }

    pub(super) fn finish(self) -> ModelResponse {
        self.response
    }
}
