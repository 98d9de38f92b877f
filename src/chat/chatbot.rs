//! Chatbot orchestration
//!
//! Bundles a model handle, conversation history, and a tool set. Dispatches
//! tool execution and re-invokes the model after tool results.

use std::sync::Arc;

use crate::chat::history::History;
use crate::chat::reply::ReplyStream;
use crate::core::{Config, Message, Result, ToolCall, ToolOutcome};
use crate::llm::traits::{ChatOptions, ChatProvider, Reply, ReplyChunk};
use crate::tools::{Tool, ToolSet};

/// A chatbot: model handle, history, and invocable tools
#[derive(Clone)]
pub struct ChatBot {
    provider: Arc<dyn ChatProvider>,
    model: String,
    /// Conversation history
    pub history: History,
    /// Tools bound to every call
    pub toolset: ToolSet,
    options: Option<ChatOptions>,
    max_tool_rounds: usize,
}

impl ChatBot {
    /// Create a chatbot from a provider and model name
    pub fn from_model(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            history: History::new(),
            toolset: ToolSet::new(),
            options: None,
            max_tool_rounds: 5,
        }
    }

    /// Create a chatbot configured from the app config
    pub fn from_config(provider: Arc<dyn ChatProvider>, config: &Config) -> Self {
        let mut bot = Self::from_model(provider, config.chat.model.clone());
        bot.max_tool_rounds = config.chat.max_tool_rounds;
        if let Some(ref prompt) = config.chat.system_prompt {
            bot.history = History::from_system_prompt(prompt.clone());
        }
        bot
    }

    /// Seed the history with a system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.history = History::from_system_prompt(prompt);
        self
    }

    /// Bind tools to every call
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        for tool in tools {
            self.toolset.register(tool);
        }
        self
    }

    /// Replace the tool set
    pub fn with_toolset(mut self, toolset: ToolSet) -> Self {
        self.toolset = toolset;
        self
    }

    /// Set generation options for every call
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Cap tool-call rounds per user turn
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Model name in use
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch the model for subsequent calls
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Handle to the underlying provider
    pub fn provider(&self) -> Arc<dyn ChatProvider> {
        self.provider.clone()
    }

    /// Validate history, append the new human message, and snapshot the
    /// request inputs for this call.
    fn prepare(
        &mut self,
        new_message: Option<&str>,
        extra_tools: Option<&ToolSet>,
    ) -> Result<(Vec<Message>, Vec<crate::core::ToolSpec>, ToolSet)> {
        self.history.ensure_tools_resolved()?;

        if let Some(msg) = new_message {
            self.history.add_human(msg);
        }

        let effective = match extra_tools {
            Some(extra) => self.toolset.merge(extra),
            None => self.toolset.clone(),
        };
        let specs = effective.bound_specs()?;

        Ok((self.history.messages().to_vec(), specs, effective))
    }

    /// Send a message and wait for the complete reply.
    ///
    /// Passing `None` re-invokes the model on the existing history, which is
    /// how the conversation continues after tool results.
    pub async fn chat(&mut self, new_message: Option<&str>) -> Result<ChatTurn<'_>> {
        self.chat_with_tools(new_message, None).await
    }

    /// Like [`chat`](Self::chat) with extra tools merged in for this call only
    pub async fn chat_with_tools(
        &mut self,
        new_message: Option<&str>,
        extra_tools: Option<&ToolSet>,
    ) -> Result<ChatTurn<'_>> {
        let (messages, specs, effective) = self.prepare(new_message, extra_tools)?;

        let reply = self
            .provider
            .chat(&self.model, &messages, &specs, self.options.clone())
            .await?;

        self.history.add_message(Message::ai_with_calls(
            reply.content.clone(),
            reply.tool_calls.clone(),
        ));

        Ok(ChatTurn::new(self, reply, effective))
    }

    /// Send a message and stream the reply back fragment by fragment
    pub async fn stream(&mut self, new_message: Option<&str>) -> Result<ReplyStream<'_>> {
        self.stream_with_tools(new_message, None).await
    }

    /// Like [`stream`](Self::stream) with extra tools merged in for this call only
    pub async fn stream_with_tools(
        &mut self,
        new_message: Option<&str>,
        extra_tools: Option<&ToolSet>,
    ) -> Result<ReplyStream<'_>> {
        let (messages, specs, effective) = self.prepare(new_message, extra_tools)?;

        let chunks = self
            .provider
            .chat_stream(&self.model, &messages, &specs, self.options.clone())
            .await?;

        let model = self.model.clone();
        Ok(ReplyStream::new(chunks, self, effective, model))
    }

    /// Run a full user turn: stream the reply, execute any tool calls in
    /// order, feed results back, and re-invoke until the model answers
    /// without tools or the round cap is hit. Returns the final text.
    pub async fn run_to_completion<F>(&mut self, message: &str, mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&ReplyChunk),
    {
        let mut new_message = Some(message.to_string());
        let mut rounds = 0;

        loop {
            let content;
            let had_tools;
            {
                let mut stream = self.stream(new_message.as_deref()).await?;
                while let Some(chunk) = stream.next_chunk().await {
                    on_chunk(&chunk?);
                }
                let mut turn = stream.into_turn()?;
                had_tools = turn.has_tool_calls();
                if had_tools {
                    turn.execute_tools().await?;
                }
                content = turn.into_reply().content;
            }

            if !had_tools {
                return Ok(content);
            }

            rounds += 1;
            if rounds >= self.max_tool_rounds {
                return Ok(content);
            }
            new_message = None;
        }
    }

    /// Derive a new chatbot sharing this one's model, with fresh history and
    /// no tools
    pub fn fresh(&self, system_prompt: Option<&str>) -> Self {
        let mut bot = Self::from_model(self.provider.clone(), self.model.clone());
        if let Some(prompt) = system_prompt {
            bot.history = History::from_system_prompt(prompt);
        }
        bot.options = self.options.clone();
        bot.max_tool_rounds = self.max_tool_rounds;
        bot
    }

    /// Derive a copy with emptied history
    pub fn empty(&self, keep_system_prompt: bool, clear_tools: bool) -> Self {
        let mut bot = self.clone();
        bot.history = self.history.empty(keep_system_prompt);
        if clear_tools {
            bot.toolset = ToolSet::new();
        }
        bot
    }
}

impl std::fmt::Debug for ChatBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatBot")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("history_len", &self.history.len())
            .field("tools", &self.toolset.names())
            .finish()
    }
}

/// A completed model reply plus the machinery to resolve its tool calls
pub struct ChatTurn<'a> {
    bot: &'a mut ChatBot,
    reply: Reply,
    toolset: ToolSet,
}

impl std::fmt::Debug for ChatTurn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatTurn")
            .field("bot", &self.bot)
            .field("reply", &self.reply)
            .field("tools", &self.toolset.names())
            .finish()
    }
}

impl<'a> ChatTurn<'a> {
    pub(crate) fn new(bot: &'a mut ChatBot, reply: Reply, toolset: ToolSet) -> Self {
        Self {
            bot,
            reply,
            toolset,
        }
    }

    /// The complete reply
    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Text content of the reply
    pub fn content(&self) -> &str {
        &self.reply.content
    }

    /// Whether the model requested any tool invocations
    pub fn has_tool_calls(&self) -> bool {
        self.reply.has_tool_calls()
    }

    /// Tool calls requested by the model
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.reply.tool_calls
    }

    /// Execute the reply's tool calls in call order, appending each result to
    /// the conversation history. A failing tool aborts the remainder; results
    /// already produced stay in history.
    pub async fn execute_tools(&mut self) -> Result<Vec<ToolOutcome>> {
        let mut outcomes = Vec::with_capacity(self.reply.tool_calls.len());

        for call in self.reply.tool_calls.clone() {
            let outcome = self.toolset.execute(&call).await?;
            self.bot
                .history
                .add_tool_result(&call.id, outcome.output.clone());
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Give up the borrow and keep the reply
    pub fn into_reply(self) -> Reply {
        self.reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParleyError, Role};
    use crate::llm::testing::ScriptedProvider;
    use async_trait::async_trait;

    struct WeatherTool;

    #[async_trait]
    impl Tool for WeatherTool {
        fn name(&self) -> &str {
            "check_weather"
        }

        fn description(&self) -> &str {
            "Get the current weather for a city"
        }

        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            })
        }

        async fn invoke(&self, args: serde_json::Value) -> Result<String> {
            let city = args.get("city").and_then(|v| v.as_str()).unwrap_or("here");
            Ok(format!("Sunny in {city}"))
        }
    }

    fn weather_call(id: &str) -> ToolCall {
        ToolCall::new(id, "check_weather", serde_json::json!({"city": "Oslo"}))
    }

    #[tokio::test]
    async fn test_chat_appends_reply_to_history() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            "Hi!",
        )]));
        let mut bot =
            ChatBot::from_model(provider, "scripted").with_system_prompt("Be friendly");

        let turn = bot.chat(Some("hello")).await.unwrap();
        assert_eq!(turn.content(), "Hi!");
        assert_eq!(bot.history.len(), 3);
        assert_eq!(bot.history.last_ai().unwrap().content, "Hi!");
    }

    #[tokio::test]
    async fn test_tool_roundtrip_keeps_history_consistent() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::call_reply("", vec![weather_call("call_0")]),
            ScriptedProvider::text_reply("It's sunny in Oslo."),
        ]));
        let mut bot = ChatBot::from_model(provider.clone(), "scripted")
            .with_tools(vec![Arc::new(WeatherTool)]);

        let mut turn = bot.chat(Some("Weather in Oslo?")).await.unwrap();
        assert!(turn.has_tool_calls());

        let outcomes = turn.execute_tools().await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].output, "Sunny in Oslo");

        let followup = bot.chat(None).await.unwrap();
        assert_eq!(followup.content(), "It's sunny in Oslo.");

        assert!(bot.history.ensure_tools_resolved().is_ok());
        // The second request must carry the tool result back to the model.
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1]
            .messages
            .iter()
            .any(|m| m.role == Role::Tool && m.content == "Sunny in Oslo"));
    }

    #[tokio::test]
    async fn test_unresolved_calls_block_next_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::call_reply("", vec![weather_call("call_0")]),
            ScriptedProvider::text_reply("never reached"),
        ]));
        let mut bot = ChatBot::from_model(provider, "scripted")
            .with_tools(vec![Arc::new(WeatherTool)]);

        let turn = bot.chat(Some("Weather?")).await.unwrap();
        assert!(turn.has_tool_calls());
        // Skip execute_tools and try to keep chatting.
        let err = bot.chat(Some("Still there?")).await.unwrap_err();
        assert!(matches!(err, ParleyError::UnresolvedToolCalls { .. }));
    }

    #[tokio::test]
    async fn test_run_to_completion_executes_tools_and_reinvokes() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::call_reply("", vec![weather_call("call_0")]),
            ScriptedProvider::text_reply("Sunny, no jacket needed."),
        ]));
        let mut bot = ChatBot::from_model(provider, "scripted")
            .with_tools(vec![Arc::new(WeatherTool)]);

        let mut streamed = String::new();
        let answer = bot
            .run_to_completion("Do I need a jacket in Oslo?", |chunk| {
                streamed.push_str(&chunk.content);
            })
            .await
            .unwrap();

        assert_eq!(answer, "Sunny, no jacket needed.");
        assert!(streamed.contains("Sunny, no jacket needed."));
        assert!(bot.history.ensure_tools_resolved().is_ok());
    }

    #[tokio::test]
    async fn test_run_to_completion_stops_at_round_cap() {
        // The model keeps asking for tools; the loop must still terminate.
        let replies = (0..10)
            .map(|i| ScriptedProvider::call_reply("", vec![weather_call(&format!("call_{i}"))]))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(replies));
        let mut bot = ChatBot::from_model(provider.clone(), "scripted")
            .with_tools(vec![Arc::new(WeatherTool)])
            .with_max_tool_rounds(3);

        let answer = bot
            .run_to_completion("Weather?", |_| {})
            .await
            .unwrap();
        assert_eq!(answer, "");
        assert_eq!(provider.calls.lock().unwrap().len(), 3);
        // Every executed round left history consistent.
        assert!(bot.history.ensure_tools_resolved().is_ok());
    }

    #[tokio::test]
    async fn test_per_call_tools_are_usable_for_execution() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::call_reply(
            "",
            vec![weather_call("call_0")],
        )]));
        let mut bot = ChatBot::from_model(provider.clone(), "scripted");

        let extra = ToolSet::from_tools(vec![Arc::new(WeatherTool) as Arc<dyn Tool>]);
        let mut turn = bot
            .chat_with_tools(Some("Weather?"), Some(&extra))
            .await
            .unwrap();

        // The extra tool was offered to the model and resolves at execution.
        assert_eq!(
            provider.calls.lock().unwrap()[0].tool_names,
            vec!["check_weather"]
        );
        let outcomes = turn.execute_tools().await.unwrap();
        assert_eq!(outcomes[0].output, "Sunny in Oslo");
    }

    #[tokio::test]
    async fn test_fresh_and_empty_derivations() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let mut bot = ChatBot::from_model(provider, "scripted")
            .with_system_prompt("Be brief")
            .with_tools(vec![Arc::new(WeatherTool)]);
        bot.history.add_human("hello");

        let fresh = bot.fresh(Some("New persona"));
        assert_eq!(fresh.history.len(), 1);
        assert!(fresh.toolset.is_empty());

        let emptied = bot.empty(true, false);
        assert_eq!(emptied.history.len(), 1);
        assert_eq!(emptied.history.first_system().unwrap().content, "Be brief");
        assert_eq!(emptied.toolset.len(), 1);
    }
}
