//! Tool set - named tools with merge and lookup semantics
//!
//! Central registry the chatbot binds to model calls and dispatches
//! model-emitted tool calls against.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::{ParleyError, Result, ToolCall, ToolOutcome, ToolSpec};

/// A tool the model may request be invoked
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as the model will address it
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON Schema for the arguments
    fn parameters(&self) -> serde_json::Value;

    /// Invoke the tool with model-emitted arguments
    async fn invoke(&self, args: serde_json::Value) -> Result<String>;

    /// Wire definition handed to the provider
    fn spec(&self) -> ToolSpec {
        ToolSpec::function(self.name(), self.description(), self.parameters())
    }
}

/// How the model is allowed to choose tools for a call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// All registered tools are offered
    #[default]
    Auto,
    /// No tools are offered for this call
    None,
    /// Only the named tool is offered
    Named(String),
}

/// Registry of tools in registration order
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    choice: ToolChoice,
}

impl ToolSet {
    /// Create an empty tool set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tool set from a list of tools
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut set = Self::new();
        for tool in tools {
            set.register(tool);
        }
        set
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if let Some(existing) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *existing = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Set how tools are offered to the model
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.choice = choice;
        self
    }

    /// Current tool choice
    pub fn tool_choice(&self) -> &ToolChoice {
        &self.choice
    }

    /// Merge another tool set over this one. The other set wins on name
    /// collisions and its tool choice replaces this one's.
    pub fn merge(&self, other: &ToolSet) -> ToolSet {
        let mut merged = self.clone();
        for tool in &other.tools {
            merged.register(tool.clone());
        }
        merged.choice = other.choice.clone();
        merged
    }

    /// Wire definitions for the current tool choice, in registration order
    pub fn bound_specs(&self) -> Result<Vec<ToolSpec>> {
        match &self.choice {
            ToolChoice::Auto => Ok(self.tools.iter().map(|t| t.spec()).collect()),
            ToolChoice::None => Ok(Vec::new()),
            ToolChoice::Named(name) => {
                let tool = self.get(name)?;
                Ok(vec![tool.spec()])
            }
        }
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ParleyError::UnknownTool {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutcome> {
        let tool = self.get(&call.name)?;
        let output = tool
            .invoke(call.args.clone())
            .await
            .map_err(|e| match e {
                err @ ParleyError::ToolFailed { .. } => err,
                other => ParleyError::tool(&call.name, other.to_string()),
            })?;

        Ok(ToolOutcome {
            call: call.clone(),
            output,
        })
    }

    /// Names of all registered tools
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Human-readable name/description listing for intro screens
    pub fn render(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
