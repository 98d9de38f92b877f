//! Chat module - history, reply accumulation, and orchestration

pub mod chatbot;
pub mod group;
pub mod history;
pub mod reply;
pub mod structured;

pub use chatbot::{ChatBot, ChatTurn};
pub use group::AgentGroup;
pub use history::History;
pub use reply::ReplyStream;
pub use structured::SchemaBot;
