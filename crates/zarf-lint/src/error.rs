//! Error types for linting

use thiserror::Error;
use zarf_compose::ComposeError;
use zarf_core::CoreError;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("failed to read {path}: {source}")]
    ReadDefinition {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseDefinition {
        path: String,
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("failed to convert package to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LintError>;
