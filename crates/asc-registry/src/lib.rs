mod entry;
mod registry;

pub use entry::RegistryEntry;
pub use registry::ScriptRegistry;

use std::path::PathBuf;

use asc_core::ScriptError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read script {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Scripts directory {path} does not exist.")]
    RootNotFound { path: PathBuf },
    #[error("Script {path} does not exist.")]
    NotFound { path: PathBuf },
    #[error("{path} is not a file.")]
    NotAFile { path: PathBuf },
    #[error("{path} does not end with .{extension}.")]
    WrongExtension { path: PathBuf, extension: String },
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "REGISTRY_READ_FILE",
            Self::RootNotFound { .. } => "REGISTRY_ROOT_NOT_FOUND",
            Self::NotFound { .. } => "REGISTRY_NOT_FOUND",
            Self::NotAFile { .. } => "REGISTRY_NOT_A_FILE",
            Self::WrongExtension { .. } => "REGISTRY_WRONG_EXTENSION",
        }
    }
}

impl From<RegistryError> for ScriptError {
    fn from(error: RegistryError) -> Self {
        ScriptError::new(error.code(), error.to_string())
    }
}
