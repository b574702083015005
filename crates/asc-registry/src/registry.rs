use std::fs;
use std::path::{Path, PathBuf};

use asc_core::{ScriptBody, DEFAULT_SCRIPT_EXTENSION};
use asc_runtime::{ResolvedScript, ScriptResolver};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{RegistryEntry, RegistryError};

/// Every script asset found under the known roots, in discovery order.
#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    extension: String,
    roots: Vec<PathBuf>,
    entries: Vec<RegistryEntry>,
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SCRIPT_EXTENSION)
    }
}

impl ScriptRegistry {
    pub fn new(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            roots: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Scans `root` recursively and returns how many new scripts were added.
    /// Unreadable subtrees and files are logged and skipped.
    pub fn discover(&mut self, root: &Path) -> Result<usize, RegistryError> {
        if !root.is_dir() {
            return Err(RegistryError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        let root = normalize(root);
        self.remember_root(&root);
        Ok(self.scan(&root))
    }

    /// Like `discover`, but a missing root is not an error.
    pub fn discover_optional(&mut self, root: &Path) -> usize {
        if !root.is_dir() {
            debug!(root = %root.display(), "optional scripts directory absent");
            return 0;
        }
        let root = normalize(root);
        self.remember_root(&root);
        self.scan(&root)
    }

    pub fn add(&mut self, path: impl AsRef<Path>) -> Result<&RegistryEntry, RegistryError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RegistryError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(RegistryError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        if !matches_extension(path, &self.extension) {
            return Err(RegistryError::WrongExtension {
                path: path.to_path_buf(),
                extension: self.extension.clone(),
            });
        }

        let path = normalize(path);
        if let Some(index) = self.position(&path) {
            return Ok(&self.entries[index]);
        }
        let entry = load_entry(&path, &self.roots, &self.extension)?;
        debug!(script = %entry.display_name(), "script added");
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<RegistryEntry> {
        let index = self.position(&normalize(path.as_ref()))?;
        let entry = self.entries.remove(index);
        debug!(script = %entry.display_name(), "script removed");
        Some(entry)
    }

    /// Re-reads every known script and root. Bodies already handed out are
    /// left untouched.
    pub fn refresh(&mut self) {
        let previous = std::mem::take(&mut self.entries);
        let mut dropped = 0usize;
        for entry in previous {
            if !entry.path.is_file() {
                debug!(script = %entry.display_name(), "script vanished");
                dropped += 1;
                continue;
            }
            match load_entry(&entry.path, &self.roots, &self.extension) {
                Ok(fresh) => self.entries.push(fresh),
                Err(error) => {
                    warn!(script = %entry.display_name(), "keeping previous body: {}", error);
                    self.entries.push(entry);
                }
            }
        }

        let mut added = 0usize;
        for root in self.roots.clone() {
            if root.is_dir() {
                added += self.scan(&root);
            }
        }
        info!(added, dropped, total = self.entries.len(), "scripts refreshed");
    }

    /// Case-insensitive lookup: an exact name wins, otherwise the first entry
    /// whose `category/name` contains `name`.
    pub fn find(&self, name: &str) -> Option<&RegistryEntry> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| {
                entry.name.to_lowercase() == needle
                    || entry.display_name().to_lowercase() == needle
            })
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| entry.display_name().to_lowercase().contains(&needle))
            })
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<ScriptBody> {
        self.find(name).map(|entry| entry.body.clone())
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remember_root(&mut self, root: &Path) {
        if !self.roots.iter().any(|known| known == root) {
            self.roots.push(root.to_path_buf());
        }
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|entry| entry.path == path)
    }

    fn scan(&mut self, root: &Path) -> usize {
        let walker = WalkDir::new(root).follow_links(false).sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        });

        let mut added = 0usize;
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(error) => {
                    warn!(root = %root.display(), "skipping unreadable path: {}", error);
                    continue;
                }
            };
            let path = item.path();
            if !item.file_type().is_file() || !matches_extension(path, &self.extension) {
                continue;
            }
            if self.position(path).is_some() {
                continue;
            }

            match load_entry(path, &self.roots, &self.extension) {
                Ok(entry) => {
                    debug!(script = %entry.display_name(), "script discovered");
                    self.entries.push(entry);
                    added += 1;
                }
                Err(error) => warn!(path = %path.display(), "skipping script: {}", error),
            }
        }

        info!(root = %root.display(), added, total = self.entries.len(), "scanned scripts directory");
        added
    }
}

impl ScriptResolver for ScriptRegistry {
    fn resolve(&self, name: &str) -> Option<ResolvedScript> {
        self.find(name).map(|entry| ResolvedScript {
            name: entry.name.clone(),
            body: entry.body.clone(),
        })
    }
}

/// Canonical form used as the identity of roots and entries. Paths that cannot
/// be resolved (already deleted, for instance) are kept as given.
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn matches_extension(path: &Path, extension: &str) -> bool {
    let Some(file_name) = path.file_name().map(|name| name.to_string_lossy()) else {
        return false;
    };
    let suffix = format!(".{}", extension.to_lowercase());
    let lowered = file_name.to_lowercase();
    lowered.len() > suffix.len() && lowered.ends_with(&suffix)
}

fn load_entry(
    path: &Path,
    roots: &[PathBuf],
    extension: &str,
) -> Result<RegistryEntry, RegistryError> {
    let bytes = fs::read(path).map_err(|source| RegistryError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let source = String::from_utf8_lossy(&bytes);

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem_len = file_name.len().saturating_sub(extension.len() + 1);
    let name = file_name.get(..stem_len).unwrap_or(&file_name).to_string();

    Ok(RegistryEntry {
        path: path.to_path_buf(),
        name,
        category: category_of(path, roots),
        body: ScriptBody::from_source(&source),
    })
}

fn category_of(path: &Path, roots: &[PathBuf]) -> String {
    roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .and_then(Path::parent)
        .map(|dir| {
            dir.components()
                .map(|part| part.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
