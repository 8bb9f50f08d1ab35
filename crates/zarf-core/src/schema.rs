//! JSON schema validation of package definitions
//!
//! The schema document is an external asset. Validators obtain its bytes
//! through a [`FileLoader`] so the packaging of the asset (embedded in the
//! binary, on disk next to a development checkout) stays out of this module.

use serde_json::Value as JsonValue;
use std::io;
use std::path::PathBuf;

use crate::error::{CoreError, Result};

/// Name of the package schema asset
pub const SCHEMA_FILE: &str = "zarf.schema.json";

static EMBEDDED_SCHEMA: &[u8] = include_bytes!("../zarf.schema.json");

/// Reads named assets
pub trait FileLoader {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Serves the schema compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSchema;

impl FileLoader for EmbeddedSchema {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        if path == SCHEMA_FILE {
            Ok(EMBEDDED_SCHEMA.to_vec())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no embedded asset named {}", path),
            ))
        }
    }
}

/// Reads assets from a directory
#[derive(Debug, Clone)]
pub struct DirLoader {
    pub root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileLoader for DirLoader {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// Dotted field path (`components.0.name`), or `(root)`
    pub path: String,
    pub message: String,
}

/// Result of schema validation
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Compiled package schema
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a schema document
    pub fn new(schema: &JsonValue) -> Result<Self> {
        let compiled = jsonschema::validator_for(schema).map_err(|e| CoreError::InvalidSchema {
            message: e.to_string(),
        })?;
        Ok(Self { compiled })
    }

    /// Read `zarf.schema.json` through a loader and compile it
    pub fn from_loader(loader: &dyn FileLoader) -> Result<Self> {
        let bytes = loader
            .read_file(SCHEMA_FILE)
            .map_err(|source| CoreError::SchemaAsset {
                path: SCHEMA_FILE.to_string(),
                source,
            })?;
        let schema: JsonValue = serde_json::from_slice(&bytes)?;
        Self::new(&schema)
    }

    /// The schema shipped with this crate
    pub fn embedded() -> Result<Self> {
        Self::from_loader(&EmbeddedSchema)
    }

    /// Validate a package in its generic structural form
    pub fn validate(&self, value: &JsonValue) -> ValidationResult {
        if self.compiled.is_valid(value) {
            return ValidationResult::success();
        }

        let errors = self
            .compiled
            .iter_errors(value)
            .map(|e| ValidationErrorInfo {
                path: pointer_to_field_path(&e.instance_path.to_string()),
                message: format_validation_error(&e),
            })
            .collect();

        ValidationResult::failure(errors)
    }
}

/// `/components/0/name` -> `components.0.name`; the empty pointer is `(root)`
fn pointer_to_field_path(pointer: &str) -> String {
    if pointer.is_empty() || pointer == "/" {
        return "(root)".to_string();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn format_validation_error(error: &jsonschema::ValidationError) -> String {
    error.to_string().replace('"', "'")
}
