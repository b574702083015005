use std::path::{Path, PathBuf};

use asc_core::ScriptBody;

/// One discovered script asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub(crate) path: PathBuf,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) body: ScriptBody,
}

impl RegistryEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory of the script relative to its root, `/`-separated; empty at
    /// the root itself.
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn body(&self) -> &ScriptBody {
        &self.body
    }

    pub fn display_name(&self) -> String {
        if self.category.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.category, self.name)
        }
    }

    pub fn preview(&self, max_lines: usize) -> String {
        let lines = self.body.lines();
        if lines.is_empty() {
            return "(Empty script)".to_string();
        }

        let shown = lines.len().min(max_lines);
        let mut preview = lines[..shown].join("\n");
        if lines.len() > shown {
            if !preview.is_empty() {
                preview.push('\n');
            }
            preview.push_str(&format!("... ({} more lines)", lines.len() - shown));
        }
        preview
    }
}
