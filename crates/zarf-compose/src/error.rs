//! Error types for chain building and composition

use thiserror::Error;
use zarf_core::{CoreError, ValidationErrors};

#[derive(Debug, Error)]
pub enum ComposeError {
    // ============ Chain Errors ============
    #[error("cannot build import chain: architecture must be provided")]
    MissingArchitecture,

    #[error("detected circular import chain: {chain}")]
    CircularImport { chain: String },

    #[error("detected malformed import chain, cannot import local components from remote components")]
    LocalFromRemote,

    #[error("{0}")]
    InvalidImport(ValidationErrors),

    #[error("component {name:?} not found in {location:?}")]
    ComponentNotFound { name: String, location: String },

    #[error("multiple components named {name:?} found in {location:?} satisfying {architecture:?}")]
    AmbiguousComponent {
        name: String,
        location: String,
        architecture: String,
    },

    // ============ Source Errors ============
    #[error("failed to read {path}: {source}")]
    ReadDefinition {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseDefinition {
        path: String,
        source: CoreError,
    },

    #[error("invalid OCI reference {reference:?}: {message}")]
    InvalidReference { reference: String, message: String },

    #[error("failed to fetch {reference}: {message}")]
    Fetch { reference: String, message: String },

    #[error("fetching {reference} timed out after {seconds}s")]
    Timeout { reference: String, seconds: u64 },

    #[error("{source_kind} source cannot fetch {reference}")]
    UnsupportedSource {
        source_kind: &'static str,
        reference: String,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    // ============ Compose Errors ============
    #[error("component {name:?}: \"only.localOS\" {existing:?} cannot be redefined as {redefined:?} during compose")]
    LocalOsRedefined {
        name: String,
        existing: String,
        redefined: String,
    },

    #[error("failed to template component {name:?}: {source}")]
    Template {
        name: String,
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, ComposeError>;
