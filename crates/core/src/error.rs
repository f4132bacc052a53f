//! Error types for the SlidePilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all SlidePilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the inference provider. These abort the current loop.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Failures of a single tool invocation.
///
/// None of these escape the executor: each one is turned into a tool result
/// with `is_error = true` so the model can try something else.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("{field} must be 1 or greater (got {value})")]
    InvalidIndex { field: &'static str, value: i64 },

    #[error("no document loaded - please load a presentation first")]
    NoDocument,

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("backend operation {operation} failed: {reason}\nOutput: {output}")]
    Backend {
        operation: String,
        reason: String,
        output: String,
    },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout { operation: String, timeout_secs: u64 },

    #[error("tool execution failed: {tool_name} - {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

/// Registry construction errors (startup only).
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("tool registered twice: {0}")]
    Duplicate(String),

    #[error("schema generation failed for {tool}: {reason}")]
    Schema { tool: String, reason: String },
}
