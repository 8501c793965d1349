//! Error Types

use thiserror::Error;

use crate::tools::ToolName;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Orchestration error types.
///
/// Only two kinds cross a component boundary during task execution:
/// tool failures (the executor records them as failed traces) and
/// completion failures (the planner, composer, and composite flow
/// resolve them to deterministic fallbacks).
#[derive(Error, Debug)]
pub enum AgentError {
    /// Tool could not produce output: bad input, missing credentials,
    /// or an upstream service error
    #[error("{0}")]
    ToolExecution(String),

    /// Requested tool is not part of the agent's configured set
    #[error("Tool '{0}' is not available for this agent")]
    ToolUnavailable(ToolName),

    /// Completion backend call failed or returned unusable content
    #[error("Completion error: {0}")]
    Completion(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
