//! Core module - shared types, configuration, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::{ChatConfig, Config, OllamaConfig, StreamingConfig};
pub use error::{ParleyError, Result};
pub use types::{FunctionSpec, Message, Role, ToolCall, ToolOutcome, ToolSpec};
