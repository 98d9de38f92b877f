//! Conversation history
//!
//! Ordered log of typed turns with the tool-call consistency check: every AI
//! tool call must be answered by a tool result before the next turn.

use crate::core::{Message, ParleyError, Result, Role};

/// Ordered log of conversation turns
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history seeded with a system prompt
    pub fn from_system_prompt(prompt: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.add_system(prompt);
        history
    }

    /// Add a system message
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.add_message(Message::system(content));
    }

    /// Add a human message
    pub fn add_human(&mut self, content: impl Into<String>) {
        self.add_message(Message::human(content));
    }

    /// Add an AI message
    pub fn add_ai(&mut self, content: impl Into<String>) {
        self.add_message(Message::ai(content));
    }

    /// Add a tool result answering the call with the given id
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.add_message(Message::tool_result(tool_call_id, content));
    }

    /// Add any message to the history
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterate over messages
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Get the first system message
    pub fn first_system(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::System)
    }

    /// Get the most recent AI message
    pub fn last_ai(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Ai)
    }

    /// Get the most recent human message
    pub fn last_human(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Human)
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Derive an empty history, optionally keeping the system prompt
    pub fn empty(&self, keep_system_prompt: bool) -> Self {
        if keep_system_prompt {
            if let Some(system) = self.first_system() {
                return Self::from_system_prompt(system.content.clone());
            }
        }
        Self::new()
    }

    /// Verify there are no outstanding tool calls.
    ///
    /// Each AI tool call id must be matched by a tool message with that id in
    /// the run of tool messages that follows, before any later non-tool turn.
    pub fn ensure_tools_resolved(&self) -> Result<()> {
        let mut unresolved: Vec<String> = Vec::new();

        for (i, message) in self.messages.iter().enumerate() {
            if message.role != Role::Ai || !message.has_tool_calls() {
                continue;
            }

            let calls = message.tool_calls.as_deref().unwrap_or_default();
            let answered: Vec<&str> = self.messages[i + 1..]
                .iter()
                .take_while(|m| m.role == Role::Tool)
                .filter_map(|m| m.tool_call_id.as_deref())
                .collect();

            for call in calls {
                if !answered.contains(&call.id.as_str()) {
                    unresolved.push(call.id.clone());
                }
            }
        }

        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(ParleyError::UnresolvedToolCalls { ids: unresolved })
        }
    }

    /// Render the whole log as a readable transcript
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            out.push_str(&format!("{}: {}\n", message.role, message.content));
            if let Some(calls) = &message.tool_calls {
                for call in calls {
                    out.push_str(&format!("  [tool call {} {}({})]\n", call.id, call.name, call.args));
                }
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
