//! Reply accumulation over a chunked model stream
//!
//! Turns a stream of reply fragments into a complete reply: content deltas are
//! appended, tool calls collected, and the assembled AI message is committed to
//! the owning history once the stream is exhausted. Tool calls cannot be read
//! before exhaustion.

use futures::StreamExt;
use std::io::{self, Write};

use crate::chat::chatbot::{ChatBot, ChatTurn};
use crate::core::{Message, ParleyError, Result, ToolCall};
use crate::llm::traits::{ChunkStream, Reply, ReplyChunk, TokenUsage};
use crate::tools::ToolSet;

/// Accumulates reply fragments into a complete reply
#[derive(Debug, Default)]
pub(crate) struct ReplyBuilder {
    content: String,
    tool_calls: Vec<ToolCall>,
    usage: Option<TokenUsage>,
}

impl ReplyBuilder {
    /// Fold one fragment into the accumulated state
    pub(crate) fn absorb(&mut self, chunk: &ReplyChunk) {
        self.content.push_str(&chunk.content);
        self.tool_calls.extend(chunk.tool_calls.iter().cloned());
        if chunk.usage.is_some() {
            self.usage = chunk.usage.clone();
        }
    }

    pub(crate) fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// The accumulated state as an AI history message
    pub(crate) fn message(&self) -> Message {
        Message::ai_with_calls(self.content.clone(), self.tool_calls.clone())
    }

    /// Consume the builder into a complete reply
    pub(crate) fn finish(self, model: String) -> Reply {
        Reply {
            content: self.content,
            tool_calls: self.tool_calls,
            usage: self.usage,
            model,
        }
    }
}

/// A streamed reply being accumulated chunk by chunk.
///
/// Borrows the chatbot for the duration of the stream; the assembled AI
/// message is appended to its history when the stream ends.
pub struct ReplyStream<'a> {
    chunks: ChunkStream,
    builder: ReplyBuilder,
    exhausted: bool,
    failed: bool,
    model: String,
    toolset: ToolSet,
    bot: &'a mut ChatBot,
}

impl<'a> ReplyStream<'a> {
    pub(crate) fn new(
        chunks: ChunkStream,
        bot: &'a mut ChatBot,
        toolset: ToolSet,
        model: String,
    ) -> Self {
        Self {
            chunks,
            builder: ReplyBuilder::default(),
            exhausted: false,
            failed: false,
            model,
            toolset,
            bot,
        }
    }

    /// Pull the next fragment, folding it into the accumulated reply.
    /// Returns `None` once the stream is exhausted.
    pub async fn next_chunk(&mut self) -> Option<Result<ReplyChunk>> {
        if self.exhausted {
            return None;
        }

        match self.chunks.next().await {
            Some(Ok(chunk)) => {
                self.builder.absorb(&chunk);
                Some(Ok(chunk))
            }
            Some(Err(e)) => {
                self.exhausted = true;
                self.failed = true;
                Some(Err(e))
            }
            None => {
                self.exhausted = true;
                self.bot.history.add_message(self.builder.message());
                None
            }
        }
    }

    /// Whether the underlying stream has ended
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Content accumulated so far. Unlike tool calls, text may be read
    /// mid-stream.
    pub fn content_so_far(&self) -> &str {
        &self.builder.content
    }

    /// Tool calls collected from the stream. Errors until exhausted.
    pub fn tool_calls(&self) -> Result<&[ToolCall]> {
        if !self.exhausted || self.failed {
            return Err(ParleyError::StreamNotExhausted);
        }
        Ok(self.builder.tool_calls())
    }

    /// Drain any remaining fragments, then convert into a completed turn
    pub async fn collect(mut self) -> Result<ChatTurn<'a>> {
        while let Some(chunk) = self.next_chunk().await {
            chunk?;
        }
        self.into_turn()
    }

    /// Drain remaining fragments, printing content to stdout as it arrives
    pub async fn print_and_collect(mut self) -> Result<ChatTurn<'a>> {
        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk?;
            if !chunk.content.is_empty() {
                print!("{}", chunk.content);
                let _ = io::stdout().flush();
            }
        }
        self.into_turn()
    }

    /// Convert into a completed turn. Errors if the stream is not exhausted.
    pub fn into_turn(self) -> Result<ChatTurn<'a>> {
        if self.failed {
            return Err(ParleyError::Other(
                "stream ended with an error; reply discarded".to_string(),
            ));
        }
        if !self.exhausted {
            return Err(ParleyError::StreamNotExhausted);
        }
        Ok(ChatTurn::new(
            self.bot,
            self.builder.finish(self.model),
            self.toolset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::chatbot::ChatBot;
    use crate::llm::testing::ScriptedProvider;
    use std::sync::Arc;

    #[test]
    fn test_builder_accumulates_content_and_calls() {
        let mut builder = ReplyBuilder::default();
        builder.absorb(&ReplyChunk::content("Hel"));
        builder.absorb(&ReplyChunk::content("lo"));
        builder.absorb(&ReplyChunk::done_with_calls(vec![ToolCall::new(
            "call_0",
            "lookup",
            serde_json::json!({}),
        )]));

        let reply = builder.finish("m".to_string());
        assert_eq!(reply.content, "Hello");
        assert_eq!(reply.tool_calls.len(), 1);
    }

    #[test]
    fn test_builder_keeps_last_usage() {
        let mut builder = ReplyBuilder::default();
        let mut done = ReplyChunk::done();
        done.usage = Some(TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        });
        builder.absorb(&ReplyChunk::content("x"));
        builder.absorb(&done);

        let reply = builder.finish("m".to_string());
        assert_eq!(reply.usage.unwrap().total_tokens, 3);
    }

    #[tokio::test]
    async fn test_stream_accumulates_and_commits_to_history() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            "Hello there",
        )]));
        let mut bot = ChatBot::from_model(provider, "scripted");

        let mut stream = bot.stream(Some("hi")).await.unwrap();
        let mut seen = String::new();
        while let Some(chunk) = stream.next_chunk().await {
            seen.push_str(&chunk.unwrap().content);
        }
        assert!(stream.is_exhausted());
        assert_eq!(seen, "Hello there");

        let turn = stream.into_turn().unwrap();
        assert_eq!(turn.content(), "Hello there");
        // Human message plus committed AI message
        assert_eq!(bot.history.len(), 2);
        assert_eq!(bot.history.last_ai().unwrap().content, "Hello there");
    }

    #[tokio::test]
    async fn test_tool_calls_before_exhaustion_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            "Hello there",
        )]));
        let mut bot = ChatBot::from_model(provider, "scripted");

        let mut stream = bot.stream(Some("hi")).await.unwrap();
        // Pull a single fragment, then ask for tool calls too early.
        stream.next_chunk().await.unwrap().unwrap();
        assert_eq!(stream.content_so_far(), "Hello");
        assert!(matches!(
            stream.tool_calls(),
            Err(ParleyError::StreamNotExhausted)
        ));
    }

    #[tokio::test]
    async fn test_collect_drains_and_returns_turn() {
        let call = ToolCall::new("call_0", "lookup", serde_json::json!({"q": "x"}));
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::call_reply(
            "",
            vec![call],
        )]));
        let mut bot = ChatBot::from_model(provider, "scripted");

        let turn = bot.stream(Some("look it up")).await.unwrap().collect().await.unwrap();
        assert!(turn.has_tool_calls());
        assert_eq!(turn.tool_calls()[0].name, "lookup");
    }

    #[tokio::test]
    async fn test_empty_stream_yields_empty_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply("")]));
        let mut bot = ChatBot::from_model(provider, "scripted");

        let turn = bot.stream(Some("hi")).await.unwrap().collect().await.unwrap();
        assert_eq!(turn.content(), "");
        assert!(!turn.has_tool_calls());
    }
}
