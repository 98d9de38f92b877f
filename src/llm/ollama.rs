//! Ollama client implementation
//!
//! Async HTTP client for the Ollama API with tool calling, NDJSON streaming,
//! and structured output support.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::core::{Config, Message, ParleyError, Result, Role, ToolCall, ToolSpec};
use crate::llm::traits::{
    ChatOptions, ChatProvider, ChunkStream, Reply, ReplyChunk, TokenUsage,
};

/// Retries for non-streaming requests on transient failures
const MAX_RETRIES: u32 = 2;
/// Base delay for exponential backoff
const RETRY_BASE_MS: u64 = 250;

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    debug: bool,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

/// Ollama tool call format. The API carries no call id; ids are synthesized
/// client-side so results can be paired back to calls in history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

/// Ollama function in tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    arguments: serde_json::Value,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

impl OllamaOptions {
    fn from_options(opts: ChatOptions) -> Self {
        Self {
            temperature: opts.temperature,
            num_predict: opts.max_tokens,
            stop: opts.stop,
        }
    }
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Message in chat and streaming responses
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

/// Ollama streaming chunk response
#[derive(Debug, Deserialize)]
struct StreamChunkResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// State carried through the NDJSON chunk stream
struct StreamState {
    bytes: Pin<Box<dyn futures::Stream<Item = std::result::Result<Vec<u8>, reqwest::Error>> + Send>>,
    buffer: String,
    call_counter: usize,
    finished: bool,
    debug: bool,
}

impl OllamaClient {
    /// Create a new Ollama client with default configuration
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.ollama_url(),
            debug: config.chat.debug,
        }
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            debug: false,
        }
    }

    /// Enable or disable debug output
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Convert internal Message to Ollama wire format
    fn to_ollama_message(msg: &Message) -> OllamaMessage {
        OllamaMessage {
            role: wire_role(msg.role).to_string(),
            content: msg.content.clone(),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: tc.args.clone(),
                        },
                    })
                    .collect()
            }),
        }
    }

    /// Convert Ollama response to a Reply, synthesizing tool call ids
    fn to_reply(response: ChatResponse) -> Reply {
        let mut call_counter = 0;
        let tool_calls = response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| synthesize_call(tc, &mut call_counter))
            .collect();

        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Reply {
            content: response.message.content,
            tool_calls,
            usage,
            model: response.model,
        }
    }

    /// Debug print if enabled
    fn debug_print(&self, label: &str, content: &str) {
        if self.debug {
            if content.len() > 500 {
                eprintln!("DEBUG {}: {}...", label, &content[..500]);
            } else {
                eprintln!("DEBUG {}: {}", label, content);
            }
        }
    }

    /// POST a chat request, retrying transient failures with backoff
    async fn post_chat(
        &self,
        request: &ChatRequest<'_>,
        model: &str,
        retries: u32,
    ) -> Result<reqwest::Response> {
        let mut attempt = 0;

        loop {
            let result = self
                .client
                .post(format!("{}/api/chat", self.base_url))
                .json(request)
                .send()
                .await;

            match result {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    let error_text = response.text().await.unwrap_or_default();

                    if status.as_u16() == 404 && error_text.contains("not found") {
                        return Err(ParleyError::ModelNotFound(model.to_string()));
                    }

                    if is_retryable_status(status) && attempt < retries {
                        tokio::time::sleep(retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(ParleyError::ollama(format!(
                        "Ollama API error ({}): {}",
                        status, error_text
                    )));
                }
                Err(e) if e.is_connect() => {
                    return Err(ParleyError::ollama(format!(
                        "Cannot connect to Ollama at {}. Is it running?",
                        self.base_url
                    )));
                }
                Err(e) => {
                    if e.is_timeout() && attempt < retries {
                        tokio::time::sleep(retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(ParleyError::from(e));
                }
            }
        }
    }

    /// Check if a model is available on the server
    pub async fn is_model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models
            .iter()
            .any(|m| m == model || m.split(':').next() == model.split(':').next()))
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for OllamaClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        options: Option<ChatOptions>,
    ) -> Result<Reply> {
        let request = ChatRequest {
            model,
            messages: messages.iter().map(Self::to_ollama_message).collect(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            format: None,
            options: options.map(OllamaOptions::from_options),
            stream: false,
        };

        self.debug_print("Request", &serde_json::to_string(&request)?);

        let response = self.post_chat(&request, model, MAX_RETRIES).await?;
        let response_text = response.text().await?;
        self.debug_print("Response", &response_text);

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| ParleyError::ollama(format!("Failed to parse response: {}", e)))?;

        Ok(Self::to_reply(chat_response))
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        options: Option<ChatOptions>,
    ) -> Result<ChunkStream> {
        let request = ChatRequest {
            model,
            messages: messages.iter().map(Self::to_ollama_message).collect(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            format: None,
            options: options.map(OllamaOptions::from_options),
            stream: true,
        };

        self.debug_print("Stream Request", &serde_json::to_string(&request)?);

        // Streaming requests are not retried: a mid-stream failure would
        // otherwise replay fragments the caller already consumed.
        let response = self.post_chat(&request, model, 0).await?;

        let bytes = response.bytes_stream().map(|r| r.map(|b| b.to_vec()));
        let state = StreamState {
            bytes: Box::pin(bytes),
            buffer: String::new(),
            call_counter: 0,
            finished: false,
            debug: self.debug,
        };

        let stream = futures::stream::try_unfold(state, |mut st| async move {
            loop {
                if st.finished {
                    return Ok(None);
                }

                // Drain complete NDJSON lines from the buffer first
                if let Some(line) = next_line(&mut st.buffer) {
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<StreamChunkResponse>(&line) {
                        Ok(chunk) => {
                            let reply_chunk = convert_chunk(chunk, &mut st.call_counter);
                            return Ok(Some((reply_chunk, st)));
                        }
                        Err(e) => {
                            if st.debug {
                                eprintln!("DEBUG Stream parse error: {}: {}", e, line);
                            }
                            continue;
                        }
                    }
                }

                match st.bytes.next().await {
                    Some(Ok(bytes)) => {
                        st.buffer.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Some(Err(e)) => {
                        return Err(ParleyError::ollama(format!("Stream error: {}", e)));
                    }
                    None => {
                        st.finished = true;
                        let rest = st.buffer.trim().to_string();
                        st.buffer.clear();
                        if !rest.is_empty() {
                            if let Ok(chunk) = serde_json::from_str::<StreamChunkResponse>(&rest)
                            {
                                let reply_chunk = convert_chunk(chunk, &mut st.call_counter);
                                return Ok(Some((reply_chunk, st)));
                            }
                        }
                        return Ok(None);
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn chat_structured(
        &self,
        model: &str,
        messages: &[Message],
        schema: serde_json::Value,
        options: Option<ChatOptions>,
    ) -> Result<Reply> {
        let request = ChatRequest {
            model,
            messages: messages.iter().map(Self::to_ollama_message).collect(),
            tools: None,
            format: Some(&schema),
            options: options.map(OllamaOptions::from_options),
            stream: false,
        };

        self.debug_print("Structured Request", &serde_json::to_string(&request)?);

        let response = self.post_chat(&request, model, MAX_RETRIES).await?;
        let response_text = response.text().await?;
        self.debug_print("Response", &response_text);

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| ParleyError::ollama(format!("Failed to parse response: {}", e)))?;

        Ok(Self::to_reply(chat_response))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ParleyError::ollama(format!(
                        "Cannot connect to Ollama at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    ParleyError::from(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(ParleyError::ollama("Failed to list models"));
        }

        let models_response: ModelsResponse = response.json().await?;
        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Map a conversation role to the Ollama wire role
fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Human => "user",
        Role::Ai => "assistant",
        Role::Tool => "tool",
    }
}

/// Pop one complete line from the NDJSON buffer
fn next_line(buffer: &mut String) -> Option<String> {
    let pos = buffer.find('\n')?;
    let line = buffer[..pos].trim().to_string();
    buffer.drain(..=pos);
    Some(line)
}

fn synthesize_call(tc: OllamaToolCall, call_counter: &mut usize) -> ToolCall {
    let call = ToolCall::new(
        format!("call_{}", call_counter),
        tc.function.name,
        tc.function.arguments,
    );
    *call_counter += 1;
    call
}

/// Convert a parsed NDJSON chunk into a reply fragment
fn convert_chunk(chunk: StreamChunkResponse, call_counter: &mut usize) -> ReplyChunk {
    let mut out = ReplyChunk {
        content: String::new(),
        tool_calls: Vec::new(),
        done: chunk.done,
        usage: None,
    };

    if let Some(msg) = chunk.message {
        out.content = msg.content;
        if let Some(calls) = msg.tool_calls {
            out.tool_calls = calls
                .into_iter()
                .map(|tc| synthesize_call(tc, call_counter))
                .collect();
        }
    }

    if chunk.done {
        if let (Some(prompt), Some(completion)) = (chunk.prompt_eval_count, chunk.eval_count) {
            out.usage = Some(TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            });
        }
    }

    out
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay_ms = RETRY_BASE_MS.saturating_mul(factor).min(10_000);
    Duration::from_millis(delay_ms)
}
