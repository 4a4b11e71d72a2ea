//! Error types for Taskforge.

use thiserror::Error;

/// Result type alias using Taskforge's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Taskforge.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Model Invocation Errors
    // =========================================================================
    /// Transport-level gateway failure. Never retried by the invoker.
    #[error("Model gateway error: {0}")]
    Gateway(String),

    /// The model produced a response the invoker cannot use (missing content,
    /// no parseable JSON object). Retried up to the configured bound.
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// The invoker exhausted its retries. Carries the last raw response for
    /// diagnostics.
    #[error("Model failed to return valid JSON after {attempts} attempts. Last response: {last_response}")]
    InvokeExhausted { attempts: u32, last_response: String },

    // =========================================================================
    // Tool Dispatch Errors
    // =========================================================================
    #[error("Executor chose an invalid tool: '{0}'")]
    UnknownTool(String),

    #[error("Tool arguments must be a JSON object, got: {0}")]
    MalformedArguments(String),

    #[error("Tool '{tool}' is missing required parameter: '{param}'. Model provided: {provided}")]
    MissingParameter {
        tool: String,
        param: String,
        provided: String,
    },

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    // =========================================================================
    // Orchestration Errors
    // =========================================================================
    #[error("Task stopped by user.")]
    Stopped,

    #[error("Agent is stuck trying the same failing action repeatedly.")]
    StuckLoop,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Orchestration error: {0}")]
    Orchestration(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an invalid-response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a tool execution error.
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create an orchestration error.
    pub fn orchestration(msg: impl Into<String>) -> Self {
        Self::Orchestration(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the robust invoker may retry after this failure.
    ///
    /// Only invalid-response failures (missing content, unparseable JSON)
    /// are recoverable; everything else fails the invocation immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvalidResponse(_))
    }
}
