//! LLM turn engine.
//!
//! One run moves through `BuildRequest -> AwaitModel -> ExecuteTools ->
//! BuildRequest ...` until the model answers without calls (`Finalize`), a
//! tool hands off, or the run fails.

mod engine;
pub mod history;
pub mod instruction;
mod llm_phase;
pub mod request;
mod tool_phase;

pub use engine::run;
pub use request::{apply_transforms, RequestTransform};
