//! Custom error types for Parley
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Parley operations
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Ollama connection or API errors
    #[error("Ollama error: {0}")]
    Ollama(String),

    /// Model not available
    #[error("Model '{0}' not available in Ollama. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// A tool call named a tool that is not registered
    #[error("Unknown tool '{name}'. Registered tools: {available:?}")]
    UnknownTool { name: String, available: Vec<String> },

    /// Tool execution errors
    #[error("Tool '{name}' failed: {message}")]
    ToolFailed { name: String, message: String },

    /// History contains AI tool calls with no matching tool results
    #[error(
        "Unresolved tool calls in history: {ids:?}. \
         Execute the pending tool calls before sending the next message."
    )]
    UnresolvedToolCalls { ids: Vec<String> },

    /// Tool calls or the full reply were requested before the stream finished
    #[error("Stream is not exhausted yet. Drain the stream or call collect() first.")]
    StreamNotExhausted,

    /// Structured output could not be decoded into the requested type
    #[error("Failed to decode structured output: {message}. Raw content: {content}")]
    StructuredDecode { message: String, content: String },

    /// Prompt file lookup failed
    #[error("Prompt not found. Tried: {tried:?}")]
    PromptNotFound { tried: Vec<std::path::PathBuf> },

    /// Template variables did not match the placeholders in the template
    #[error("Template variable mismatch. Missing: {missing:?}; extra: {extra:?}")]
    TemplateVarMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Parley operations
pub type Result<T> = std::result::Result<T, ParleyError>;

impl ParleyError {
    /// Create an Ollama error
    pub fn ollama(msg: impl Into<String>) -> Self {
        Self::Ollama(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ToolFailed {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
