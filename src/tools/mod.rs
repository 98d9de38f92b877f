//! Tools module - tool trait, registry, and built-in toolkits

pub mod toolset;
pub mod workspace;

pub use toolset::{Tool, ToolChoice, ToolSet};
pub use workspace::WorkspacesToolkit;
