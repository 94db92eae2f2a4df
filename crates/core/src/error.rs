//! Error types for the loopwright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all loopwright operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Chat client error: {0}")]
    Client(#[from] ClientError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures in the conversation protocol with the remote model.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The model endpoint could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured wall-clock bound.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The endpoint answered with a non-success status.
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    /// The response body did not parse into the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The response parsed but violated the turn protocol
    /// (no choices, nameless tool call, neither text nor tool calls).
    #[error("Protocol violation: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// Dispatch target is not in the registry. Reflected back to the model
    /// as a tool-result message so it can self-correct.
    #[error("unknown tool {0}")]
    UnknownTool(String),

    #[error("duplicate tool name: {0}")]
    Duplicate(String),

    #[error("tool name '{0}' is reserved")]
    Reserved(String),

    /// A handler signalled failure. Captured by the registry and surfaced
    /// to the model as an `error:` result string, never raised to the caller.
    #[error("{0}")]
    ExecutionFailed(String),

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Terminal failures of a run, surfaced to the caller.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("chat client error: {0}")]
    Client(#[from] ClientError),

    /// The model produced no usable text after the per-turn retry budget.
    #[error("model returned an empty reply after {attempts} attempts")]
    EmptyReply { attempts: u32 },

    #[error("run cancelled")]
    Cancelled,
}
