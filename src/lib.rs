//! Parley - a personal chatbot toolkit over local LLMs
//!
//! Bundles a chat model handle, conversation history, and invocable tools
//! behind a thin API, with streaming and non-streaming reply handling and
//! structured output decoding.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Chat provider abstraction with an Ollama implementation
//! - **Chat**: History, reply accumulation, orchestration, structured output
//! - **Tools**: Tool trait, registry, and built-in toolkits
//! - **Retrieval**: Embeddings, vector store, and the retriever tool
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parley::{ChatBot, Config, OllamaClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load();
//!     let client = Arc::new(OllamaClient::from_config(&config));
//!     let mut bot = ChatBot::from_config(client, &config);
//!
//!     let answer = bot
//!         .run_to_completion("Say hello", |chunk| print!("{}", chunk.content))
//!         .await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod core;
pub mod llm;
pub mod prompt;
pub mod retrieval;
pub mod tools;

// Re-export commonly used items
pub use chat::{AgentGroup, ChatBot, ChatTurn, History, ReplyStream, SchemaBot};
pub use cli::Repl;
pub use core::{Config, Message, ParleyError, Result, Role, ToolCall, ToolOutcome, ToolSpec};
pub use llm::{ChatOptions, ChatProvider, ChunkStream, OllamaClient, Reply, ReplyChunk};
pub use prompt::PromptManager;
pub use retrieval::{DocStore, Document, OllamaEmbeddings, RetrieverTool};
pub use tools::{Tool, ToolChoice, ToolSet, WorkspacesToolkit};
