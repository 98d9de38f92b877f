//! Retrieval module - embeddings, vector store, and the retriever tool
//!
//! Closes the RAG loop through the ordinary tool-calling machinery: the model
//! asks `search_documents`, the tool embeds the query and returns the best
//! matching passages.

pub mod embeddings;
pub mod store;

pub use embeddings::OllamaEmbeddings;
pub use store::{DocStore, Document};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use crate::core::{ParleyError, Result};
use crate::tools::Tool;

/// Arguments for a document search
#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    /// What to look for in the document store
    query: String,
}

/// Tool exposing the document store to the model
pub struct RetrieverTool {
    store: Arc<DocStore>,
    embeddings: OllamaEmbeddings,
    top_k: usize,
}

impl RetrieverTool {
    /// Create a retriever over a store, embedding queries with the given client
    pub fn new(store: Arc<DocStore>, embeddings: OllamaEmbeddings) -> Self {
        Self {
            store,
            embeddings,
            top_k: 4,
        }
    }

    /// How many passages to return per search
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search the document store for passages relevant to a query"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!(schemars::schema_for!(SearchArgs))
    }

    async fn invoke(&self, args: serde_json::Value) -> Result<String> {
        let args: SearchArgs = serde_json::from_value(args)
            .map_err(|e| ParleyError::tool(self.name(), format!("bad arguments: {e}")))?;

        let query_vector = self.embeddings.embed_query(&args.query).await?;
        let hits = self.store.search(&query_vector, self.top_k);

        if hits.is_empty() {
            return Ok("No matching documents.".to_string());
        }

        Ok(hits
            .iter()
            .map(|(doc, score)| format!("[{}] ({score:.3}) {}", doc.id, doc.text))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
