//! Workspace toolkit
//!
//! A shared scratchpad the model manipulates through tools: save a titled
//! snippet, list what has been saved, and pull one back by id.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::core::{ParleyError, Result};
use crate::tools::toolset::Tool;

#[derive(Debug, Default)]
struct WorkspaceData {
    entries: BTreeMap<u64, (String, String)>,
    next_id: u64,
}

/// Scratchpad shared by the workspace tools
#[derive(Clone, Default)]
pub struct WorkspacesToolkit {
    data: Arc<Mutex<WorkspaceData>>,
}

impl WorkspacesToolkit {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// The tools operating on this workspace
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(SaveWorkspace {
                data: self.data.clone(),
            }),
            Arc::new(ViewWorkspaces {
                data: self.data.clone(),
            }),
            Arc::new(RetrieveWorkspace {
                data: self.data.clone(),
            }),
        ]
    }

    /// Number of saved entries
    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.entries.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_data<'a>(
    data: &'a Arc<Mutex<WorkspaceData>>,
    tool: &str,
) -> Result<std::sync::MutexGuard<'a, WorkspaceData>> {
    data.lock()
        .map_err(|_| ParleyError::tool(tool, "workspace state is poisoned"))
}

/// Arguments for saving a workspace entry
#[derive(Debug, Deserialize, JsonSchema)]
struct SaveArgs {
    /// Brief summary of the workspace data being saved
    summary: String,
    /// Full text of the workspace data to save
    description: String,
}

struct SaveWorkspace {
    data: Arc<Mutex<WorkspaceData>>,
}

#[async_trait]
impl Tool for SaveWorkspace {
    fn name(&self) -> &str {
        "save_workspace"
    }

    fn description(&self) -> &str {
        "Save a workspace entry containing a summary and full text"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!(schemars::schema_for!(SaveArgs))
    }

    async fn invoke(&self, args: serde_json::Value) -> Result<String> {
        let args: SaveArgs = serde_json::from_value(args)
            .map_err(|e| ParleyError::tool(self.name(), format!("bad arguments: {e}")))?;

        let mut data = lock_data(&self.data, self.name())?;
        let id = data.next_id;
        data.next_id += 1;
        data.entries
            .insert(id, (args.summary.clone(), args.description));

        Ok(format!(
            "Workspace saved with id {} with summary: '{}'.",
            id, args.summary
        ))
    }
}

struct ViewWorkspaces {
    data: Arc<Mutex<WorkspaceData>>,
}

#[async_trait]
impl Tool for ViewWorkspaces {
    fn name(&self) -> &str {
        "view_workspaces"
    }

    fn description(&self) -> &str {
        "View all available workspace ids and their summaries as a JSON list"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _args: serde_json::Value) -> Result<String> {
        let data = lock_data(&self.data, self.name())?;
        let listing: Vec<serde_json::Value> = data
            .entries
            .iter()
            .map(|(id, (summary, _))| serde_json::json!({"id": id, "summary": summary}))
            .collect();

        Ok(serde_json::to_string(&listing)?)
    }
}

/// Arguments for retrieving a workspace entry
#[derive(Debug, Deserialize, JsonSchema)]
struct RetrieveArgs {
    /// Id of the workspace entry to retrieve
    id: u64,
}

struct RetrieveWorkspace {
    data: Arc<Mutex<WorkspaceData>>,
}

#[async_trait]
impl Tool for RetrieveWorkspace {
    fn name(&self) -> &str {
        "retrieve_workspace"
    }

    fn description(&self) -> &str {
        "Retrieve the full text of a workspace entry by its id"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!(schemars::schema_for!(RetrieveArgs))
    }

    async fn invoke(&self, args: serde_json::Value) -> Result<String> {
        let args: RetrieveArgs = serde_json::from_value(args)
            .map_err(|e| ParleyError::tool(self.name(), format!("bad arguments: {e}")))?;

        let data = lock_data(&self.data, self.name())?;
        match data.entries.get(&args.id) {
            Some((_, text)) => Ok(text.clone()),
            None => Err(ParleyError::tool(
                self.name(),
                format!("no workspace with id {}", args.id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSet;
    use crate::core::ToolCall;

    #[tokio::test]
    async fn test_save_view_retrieve_flow() {
        let workspace = WorkspacesToolkit::new();
        let set = ToolSet::from_tools(workspace.tools());

        let save = ToolCall::new(
            "call_0",
            "save_workspace",
            serde_json::json!({"summary": "groceries", "description": "eggs, milk"}),
        );
        let outcome = set.execute(&save).await.unwrap();
        assert!(outcome.output.contains("id 0"));
        assert_eq!(workspace.len(), 1);

        let view = ToolCall::new("call_1", "view_workspaces", serde_json::json!({}));
        let listing = set.execute(&view).await.unwrap();
        assert!(listing.output.contains("groceries"));

        let retrieve = ToolCall::new(
            "call_2",
            "retrieve_workspace",
            serde_json::json!({"id": 0}),
        );
        let full = set.execute(&retrieve).await.unwrap();
        assert_eq!(full.output, "eggs, milk");
    }

    #[tokio::test]
    async fn test_retrieve_missing_id_fails() {
        let workspace = WorkspacesToolkit::new();
        let set = ToolSet::from_tools(workspace.tools());

        let retrieve = ToolCall::new(
            "call_0",
            "retrieve_workspace",
            serde_json::json!({"id": 99}),
        );
        let err = set.execute(&retrieve).await.unwrap_err();
        assert!(matches!(err, ParleyError::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn test_ids_increment_across_saves() {
        let workspace = WorkspacesToolkit::new();
        let set = ToolSet::from_tools(workspace.tools());

        for i in 0..3 {
            let save = ToolCall::new(
                format!("call_{i}"),
                "save_workspace",
                serde_json::json!({"summary": format!("s{i}"), "description": "text"}),
            );
            let outcome = set.execute(&save).await.unwrap();
            assert!(outcome.output.contains(&format!("id {i}")));
        }
    }
}
