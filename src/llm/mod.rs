//! LLM module - chat provider abstraction and Ollama implementation

pub mod ollama;
pub mod traits;

pub use ollama::OllamaClient;
pub use traits::{ChatOptions, ChatProvider, ChunkStream, Reply, ReplyChunk, TokenUsage};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider for exercising the chat machinery without a server.

    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::core::{Message, ParleyError, Result, ToolCall, ToolSpec};
    use crate::llm::traits::{ChatOptions, ChatProvider, ChunkStream, Reply, ReplyChunk};

    /// One recorded provider invocation
    pub(crate) struct RecordedCall {
        pub messages: Vec<Message>,
        pub tool_names: Vec<String>,
    }

    /// Plays back a scripted sequence of replies and records every request
    pub(crate) struct ScriptedProvider {
        replies: Mutex<VecDeque<Reply>>,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn text_reply(content: &str) -> Reply {
            Reply {
                content: content.to_string(),
                tool_calls: Vec::new(),
                usage: None,
                model: "scripted".to_string(),
            }
        }

        pub fn call_reply(content: &str, tool_calls: Vec<ToolCall>) -> Reply {
            Reply {
                tool_calls,
                ..Self::text_reply(content)
            }
        }

        fn record(&self, messages: &[Message], tools: &[ToolSpec]) {
            self.calls.lock().unwrap().push(RecordedCall {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.function.name.clone()).collect(),
            });
        }

        fn pop(&self) -> Result<Reply> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ParleyError::Other("scripted provider ran out of replies".into()))
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(
            &self,
            _model: &str,
            messages: &[Message],
            tools: &[ToolSpec],
            _options: Option<ChatOptions>,
        ) -> Result<Reply> {
            self.record(messages, tools);
            self.pop()
        }

        async fn chat_stream(
            &self,
            _model: &str,
            messages: &[Message],
            tools: &[ToolSpec],
            _options: Option<ChatOptions>,
        ) -> Result<ChunkStream> {
            self.record(messages, tools);
            let reply = self.pop()?;

            // Split the reply text into two fragments so accumulation is
            // actually exercised, then finish with a done fragment that
            // carries the tool calls.
            let split = reply
                .content
                .char_indices()
                .nth(reply.content.chars().count() / 2)
                .map(|(i, _)| i)
                .unwrap_or(0);
            let (head, tail) = reply.content.split_at(split);

            let mut chunks = Vec::new();
            if !head.is_empty() {
                chunks.push(Ok(ReplyChunk::content(head)));
            }
            if !tail.is_empty() {
                chunks.push(Ok(ReplyChunk::content(tail)));
            }
            chunks.push(Ok(ReplyChunk::done_with_calls(reply.tool_calls)));

            Ok(Box::pin(futures::stream::iter(chunks)))
        }

        async fn chat_structured(
            &self,
            _model: &str,
            messages: &[Message],
            _schema: serde_json::Value,
            _options: Option<ChatOptions>,
        ) -> Result<Reply> {
            self.record(messages, &[]);
            self.pop()
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["scripted".to_string()])
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
