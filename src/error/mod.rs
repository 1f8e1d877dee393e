//! Error types for Braid.

use thiserror::Error;

/// Primary error type for all Braid operations.
#[derive(Error, Debug)]
pub enum BraidError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model error ({model}): {message}")]
    Model { model: String, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Max number of llm calls exceeded (limit {limit})")]
    LlmCallLimitExceeded { limit: u64 },

    #[error("Invocation canceled")]
    Canceled,

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Session not found: {app_name}/{user_id}/{session_id}")]
    SessionNotFound {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Model,
    Serialization,
    ToolExecution,
    Budget,
    Canceled,
    NotFound,
    Unknown,
}

impl BraidError {
    /// Create a model error.
    pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::Toml(_) => ErrorCategory::Configuration,
            Self::Model { .. } | Self::Stream(_) => ErrorCategory::Model,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::ToolExecution { .. } | Self::InvalidArgument(_) => ErrorCategory::ToolExecution,
            Self::LlmCallLimitExceeded { .. } => ErrorCategory::Budget,
            Self::Canceled => ErrorCategory::Canceled,
            Self::AgentNotFound(_) | Self::SessionNotFound { .. } => ErrorCategory::NotFound,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error ends the whole invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.category(), ErrorCategory::ToolExecution)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BraidError>;
