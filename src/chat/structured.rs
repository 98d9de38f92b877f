//! Structured output
//!
//! Coerces replies into a caller-defined schema instead of free text. The
//! schema is passed through the provider's format channel and the reply
//! content is decoded with serde.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::chat::chatbot::ChatBot;
use crate::chat::history::History;
use crate::core::{Message, ParleyError, Result};
use crate::llm::traits::{ChatOptions, ChatProvider};

/// A chatbot whose replies decode into `T`
pub struct SchemaBot<T> {
    provider: Arc<dyn ChatProvider>,
    model: String,
    /// Conversation history sent with every invocation
    pub history: History,
    schema: serde_json::Value,
    options: Option<ChatOptions>,
    _output: PhantomData<fn() -> T>,
}

impl<T> SchemaBot<T>
where
    T: DeserializeOwned + JsonSchema,
{
    /// Create a schema bot from a provider and model name. The output schema
    /// is derived from `T`.
    pub fn from_model(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            history: History::new(),
            schema: serde_json::json!(schemars::schema_for!(T)),
            options: None,
            _output: PhantomData,
        }
    }

    /// Seed the history with a system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.history = History::from_system_prompt(prompt);
        self
    }

    /// Start from an existing history
    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    /// Set generation options for every call
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The derived output schema
    pub fn schema(&self) -> &serde_json::Value {
        &self.schema
    }

    /// Invoke the model and decode the reply into `T`.
    ///
    /// When `add_to_history` is set, the human message and the raw JSON reply
    /// are kept on the history after a successful decode.
    pub async fn invoke(&mut self, new_message: Option<&str>, add_to_history: bool) -> Result<T> {
        let mut messages = self.history.messages().to_vec();
        if let Some(msg) = new_message {
            messages.push(Message::human(msg));
        }

        let reply = self
            .provider
            .chat_structured(&self.model, &messages, self.schema.clone(), self.options.clone())
            .await?;

        let data: T = serde_json::from_str(&reply.content).map_err(|e| {
            ParleyError::StructuredDecode {
                message: e.to_string(),
                content: truncate(&reply.content, 200),
            }
        })?;

        if add_to_history {
            if let Some(msg) = new_message {
                self.history.add_human(msg);
            }
            self.history.add_ai(reply.content);
        }

        Ok(data)
    }
}

impl ChatBot {
    /// Derive a schema bot sharing this chatbot's model handle
    pub fn schema_bot<T>(&self) -> SchemaBot<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        SchemaBot::from_model(self.provider(), self.model().to_string())
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct CityFacts {
        name: String,
        population: u64,
    }

    #[tokio::test]
    async fn test_invoke_decodes_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            r#"{"name": "Oslo", "population": 709037}"#,
        )]));
        let mut bot: SchemaBot<CityFacts> = SchemaBot::from_model(provider, "scripted");

        let facts = bot.invoke(Some("Facts about Oslo"), false).await.unwrap();
        assert_eq!(
            facts,
            CityFacts {
                name: "Oslo".to_string(),
                population: 709037
            }
        );
        // add_to_history was false
        assert!(bot.history.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_records_history_on_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            r#"{"name": "Oslo", "population": 709037}"#,
        )]));
        let mut bot: SchemaBot<CityFacts> =
            SchemaBot::from_model(provider, "scripted").with_system_prompt("Extract facts");

        bot.invoke(Some("Facts about Oslo"), true).await.unwrap();
        assert_eq!(bot.history.len(), 3);
        assert!(bot.history.last_ai().unwrap().content.contains("Oslo"));
    }

    #[tokio::test]
    async fn test_decode_failure_reports_content() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            "not json at all",
        )]));
        let mut bot: SchemaBot<CityFacts> = SchemaBot::from_model(provider, "scripted");

        let err = bot.invoke(Some("Facts"), true).await.unwrap_err();
        match err {
            ParleyError::StructuredDecode { content, .. } => {
                assert!(content.contains("not json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing is kept on history when decode fails.
        assert!(bot.history.is_empty());
    }

    #[test]
    fn test_schema_derivation_mentions_fields() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let bot: SchemaBot<CityFacts> = SchemaBot::from_model(provider, "scripted");
        let schema = serde_json::to_string(bot.schema()).unwrap();
        assert!(schema.contains("population"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 200), "short");
        let long = "å".repeat(300);
        let cut = truncate(&long, 200);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 210);
    }
}
