//! CLI error types with exit code handling
//!
//! Library errors are flattened into a [`CliError`] whose variant decides
//! the process exit code.

use miette::Diagnostic;
use thiserror::Error;

use zarf_compose::ComposeError;
use zarf_core::{CoreError, ValidationErrors};
use zarf_lint::LintError;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Bad flag values
    #[error("Invalid input: {message}")]
    #[diagnostic(code(zarf::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Unreadable or malformed config file
    #[error("Config error: {message}")]
    #[diagnostic(code(zarf::cli::config))]
    Config { message: String },

    /// Missing or unparseable package definition
    #[error("Package error: {message}")]
    #[diagnostic(code(zarf::cli::package))]
    Package {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Import chains that could not be composed
    #[error("Compose failed: {message}")]
    #[diagnostic(code(zarf::cli::compose))]
    Compose { message: String },

    /// Structural rules broken by the composed package
    #[error("Validation failed:\n{message}")]
    #[diagnostic(code(zarf::cli::validation))]
    Validation { message: String },

    #[error("Linting failed with {errors} error(s) and {warnings} warning(s)")]
    #[diagnostic(code(zarf::cli::lint))]
    LintFailed { errors: usize, warnings: usize },

    #[error("IO error: {message}")]
    #[diagnostic(code(zarf::cli::io))]
    Io { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(zarf::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Package { .. } => exit_codes::PACKAGE_ERROR,
            CliError::Compose { .. } => exit_codes::COMPOSE_ERROR,
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::LintFailed { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn usage(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn package(message: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            help: None,
        }
    }

    pub fn compose(message: impl Into<String>) -> Self {
        Self::Compose {
            message: message.into(),
        }
    }

    pub fn lint_failed(errors: usize, warnings: usize) -> Self {
        Self::LintFailed { errors, warnings }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PackageNotFound { .. } => CliError::Package {
                message: err.to_string(),
                help: Some("Run the command from a directory containing zarf.yaml, or pass its path".to_string()),
            },
            CoreError::YamlParse(_) | CoreError::JsonParse(_) => CliError::package(err.to_string()),
            CoreError::Validation(errs) => errs.into(),
            CoreError::Io(e) => e.into(),
            CoreError::InvalidSchema { .. } | CoreError::SchemaAsset { .. } => CliError::Internal {
                message: err.to_string(),
            },
        }
    }
}

impl From<ValidationErrors> for CliError {
    fn from(errs: ValidationErrors) -> Self {
        CliError::Validation {
            message: errs
                .messages()
                .iter()
                .map(|m| format!("  - {}", m))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<ComposeError> for CliError {
    fn from(err: ComposeError) -> Self {
        match err {
            ComposeError::MissingArchitecture => CliError::usage(
                err.to_string(),
                "Pass --architecture or set metadata.architecture",
            ),
            other => CliError::compose(other.to_string()),
        }
    }
}

impl From<LintError> for CliError {
    fn from(err: LintError) -> Self {
        match err {
            LintError::ReadDefinition { .. } | LintError::ParseDefinition { .. } => {
                CliError::package(err.to_string())
            }
            LintError::Core(core) => core.into(),
            LintError::Compose(compose) => compose.into(),
            LintError::Json(_) => CliError::Internal {
                message: err.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
