//! Multi-agent chat groups
//!
//! Named chatbots that take turns responding to a shared scene, each seeing
//! what earlier speakers said in the round.

use crate::chat::chatbot::ChatBot;
use crate::core::Result;

/// A named collection of chatbots that speak in insertion order
#[derive(Default)]
pub struct AgentGroup {
    agents: Vec<(String, ChatBot)>,
}

impl AgentGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent. An agent with the same name is replaced.
    pub fn add(&mut self, name: impl Into<String>, bot: ChatBot) {
        let name = name.into();
        if let Some(existing) = self.agents.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = bot;
        } else {
            self.agents.push((name, bot));
        }
    }

    /// Get an agent by name
    pub fn get(&self, name: &str) -> Option<&ChatBot> {
        self.agents.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    /// Get a mutable agent by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ChatBot> {
        self.agents
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b)
    }

    /// Names in speaking order
    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of agents
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Run one round: every agent responds to the narration in order, seeing
    /// what earlier agents said this round. Returns (name, reply) pairs.
    pub async fn round(&mut self, narration: &str) -> Result<Vec<(String, String)>> {
        let mut exchanges: Vec<(String, String)> = Vec::new();

        for (name, bot) in &mut self.agents {
            let mut message = narration.to_string();
            if !exchanges.is_empty() {
                message.push_str("\n\nSo far this round:\n");
                for (speaker, text) in &exchanges {
                    message.push_str(&format!("{speaker}: {text}\n"));
                }
            }

            let reply = bot.run_to_completion(&message, |_| {}).await?;
            exchanges.push((name.clone(), reply));
        }

        Ok(exchanges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;
    use crate::llm::testing::ScriptedProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_round_passes_earlier_replies_forward() {
        let p1 = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            "I draw my sword.",
        )]));
        let p2 = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text_reply(
            "I cast a shield.",
        )]));

        let mut group = AgentGroup::new();
        group.add("Fighter", ChatBot::from_model(p1, "scripted"));
        group.add("Mage", ChatBot::from_model(p2.clone(), "scripted"));

        let exchanges = group.round("A troll blocks the bridge.").await.unwrap();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0], ("Fighter".to_string(), "I draw my sword.".to_string()));
        assert_eq!(exchanges[1].0, "Mage");

        // The mage's prompt included the fighter's line.
        let calls = p2.calls.lock().unwrap();
        let prompt = calls[0]
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Human)
            .unwrap();
        assert!(prompt.content.contains("Fighter: I draw my sword."));
    }

    #[test]
    fn test_add_replaces_same_name() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let mut group = AgentGroup::new();
        group.add("gm", ChatBot::from_model(provider.clone(), "a"));
        group.add("gm", ChatBot::from_model(provider, "b"));

        assert_eq!(group.len(), 1);
        assert_eq!(group.get("gm").unwrap().model(), "b");
    }
}
