//! Tools the model can call, and the dispatcher that runs them.

pub mod arguments;
pub mod dispatcher;
pub mod dynamic;
pub mod schema;
pub mod tool;
pub mod transfer;
pub mod validation;

pub use arguments::ToolArguments;
pub use dispatcher::{dispatch, ToolOutcome};
pub use dynamic::{collect_dynamic_tools, DynamicTool, DynamicToolAdapter, DynamicToolProvider};
pub use schema::{ParametersBuilder, ToolParameters};
pub use tool::{FunctionTool, Tool, ToolContext, ToolOutput};
pub use transfer::{TransferToAgentTool, TRANSFER_TOOL_NAME};
