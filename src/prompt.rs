//! Prompt management
//!
//! Loads prompt templates from a directory (exact path, then `.txt`, then
//! `.md` fallback) and renders `{{ var }}` placeholders. Strict rendering
//! requires the provided variables to match the template exactly.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{ParleyError, Result};

/// Loads and renders prompt templates from a directory
#[derive(Debug, Clone)]
pub struct PromptManager {
    root: PathBuf,
}

impl PromptManager {
    /// Create a manager rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Prompt directory root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a prompt by relative path and render it with the given variables
    pub fn get_prompt(
        &self,
        path: impl AsRef<Path>,
        vars: &HashMap<String, String>,
        strict: bool,
    ) -> Result<String> {
        let full = self.root.join(path.as_ref());
        let candidates = [
            full.clone(),
            full.with_extension("txt"),
            full.with_extension("md"),
        ];

        for candidate in &candidates {
            if candidate.is_file() {
                let text = fs::read_to_string(candidate)?;
                return render_template(&text, vars, strict);
            }
        }

        Err(ParleyError::PromptNotFound {
            tried: candidates.to_vec(),
        })
    }
}

/// List the distinct `{{ var }}` names referenced in a template, in order
pub fn template_variables(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
                rest = &after[end + 2..];
            }
            None => break,
        }
    }

    names
}

/// Render `{{ var }}` placeholders from the variable map.
///
/// Strict mode requires the provided and referenced variable sets to match
/// exactly. Non-strict rendering substitutes missing variables with nothing.
pub fn render_template(
    text: &str,
    vars: &HashMap<String, String>,
    strict: bool,
) -> Result<String> {
    if strict {
        let expected = template_variables(text);
        let missing: Vec<String> = expected
            .iter()
            .filter(|name| !vars.contains_key(*name))
            .cloned()
            .collect();
        let mut extra: Vec<String> = vars
            .keys()
            .filter(|name| !expected.contains(name))
            .cloned()
            .collect();
        extra.sort();

        if !missing.is_empty() || !extra.is_empty() {
            return Err(ParleyError::TemplateVarMismatch { missing, extra });
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if let Some(value) = vars.get(name) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unclosed placeholder renders literally
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    Ok(out)
}
