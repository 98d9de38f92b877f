//! Chat provider trait for abstracting model backends
//!
//! The model is treated as an opaque capability: send messages, get back a
//! complete reply or a stream of reply fragments.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::core::{Message, Result, ToolCall, ToolSpec};

/// A complete reply from the chat model
#[derive(Debug, Clone)]
pub struct Reply {
    /// Text content of the reply
    pub content: String,
    /// Any tool calls the model wants to make
    pub tool_calls: Vec<ToolCall>,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the reply
    pub model: String,
}

impl Reply {
    /// Whether the model requested any tool invocations
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Options for chat generation
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

/// A fragment of a streamed reply
#[derive(Debug, Clone)]
pub struct ReplyChunk {
    /// Text delta for this fragment
    pub content: String,
    /// Tool calls carried by this fragment (often only on late fragments)
    pub tool_calls: Vec<ToolCall>,
    /// Whether this is the final fragment
    pub done: bool,
    /// Token usage, reported on the final fragment
    pub usage: Option<TokenUsage>,
}

impl ReplyChunk {
    /// Create a content fragment
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            tool_calls: Vec::new(),
            done: false,
            usage: None,
        }
    }

    /// Create a final fragment
    pub fn done() -> Self {
        Self {
            content: String::new(),
            tool_calls: Vec::new(),
            done: true,
            usage: None,
        }
    }

    /// Create a final fragment carrying tool calls
    pub fn done_with_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
            done: true,
            usage: None,
        }
    }
}

/// Type alias for a boxed stream of reply fragments
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ReplyChunk>> + Send>>;

/// Trait for chat model providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send messages and get a complete reply. Tools, when non-empty, are
    /// bound to the request so the model may emit tool calls.
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        options: Option<ChatOptions>,
    ) -> Result<Reply>;

    /// Send messages and get a stream of reply fragments
    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        options: Option<ChatOptions>,
    ) -> Result<ChunkStream>;

    /// Send messages and force the reply content into the given JSON schema
    async fn chat_structured(
        &self,
        model: &str,
        messages: &[Message],
        schema: serde_json::Value,
        options: Option<ChatOptions>,
    ) -> Result<Reply>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Get the provider name
    fn name(&self) -> &str;
}
