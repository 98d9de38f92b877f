//! Shared types used across Parley modules
//!
//! Contains message structures, tool call types, and the wire form of tool
//! definitions handed to the chat model.

use serde::{Deserialize, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation
    System,
    /// The person talking to the bot
    Human,
    /// The model's replies
    Ai,
    /// Results of tool executions, paired to AI tool calls by id
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "System"),
            Role::Human => write!(f, "Human"),
            Role::Ai => write!(f, "AI"),
            Role::Tool => write!(f, "Tool"),
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
    /// Tool calls made by the model (AI messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Id of the tool call this message answers (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new human message
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new AI message
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an AI message carrying tool calls
    pub fn ai_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        }
    }

    /// Create a tool result message answering the call with the given id
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Whether this message carries any tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// A tool call emitted by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id pairing this call to its tool result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub args: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.args
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Get a boolean argument by key
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.args.get(key).and_then(|v| v.as_bool())
    }

    /// Get an integer argument by key
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.args.get(key).and_then(|v| v.as_i64())
    }
}

/// Wire form of a tool definition handed to the chat model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub spec_type: String,
    /// Function details
    pub function: FunctionSpec,
}

/// Function declaration within a tool spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// Create a new function tool spec
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            spec_type: "function".to_string(),
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Result of executing a tool call
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// The call that was executed
    pub call: ToolCall,
    /// Output returned by the tool
    pub output: String,
}

impl ToolOutcome {
    /// Render the call and its output on a single line
    pub fn summary(&self) -> String {
        format!("{}({}) -> {}", self.call.name, self.call.args, self.output)
    }
}
