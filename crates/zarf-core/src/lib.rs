//! Zarf Core - package definition model for air-gapped Kubernetes packages
//!
//! This crate provides the types shared by the composer and the linter:
//! - `Package`: the `zarf.yaml` document
//! - `Component`: a selectable unit, possibly imported from another package
//! - `Variable` / `Constant`: deploy-time values
//! - `SchemaValidator`: JSON schema validation behind a `FileLoader`

pub mod component;
pub mod error;
pub mod package;
pub mod schema;
pub mod validate;
pub mod variables;

pub use component::{
    Action, ActionDefaults, ActionSet, ActionWait, Actions, Chart, ChartVariable, Component,
    ComponentImport, ComponentOnly, DataInjection, DataInjectionTarget, File, Manifest,
    OnlyCluster, Scripts, Shell, WaitCluster, WaitNetwork, is_oci_url,
};
pub use error::{CoreError, Result, ValidationErrors};
pub use package::{BuildData, Metadata, PACKAGE_FILE, Package, PackageKind};
pub use schema::{
    DirLoader, EmbeddedSchema, FileLoader, SCHEMA_FILE, SchemaValidator, ValidationErrorInfo,
    ValidationResult,
};
pub use validate::{LOWERCASE_NAME, MAX_CHART_NAME_LENGTH, SUPPORTED_OS};
pub use variables::{Constant, InteractiveVariable, VARIABLE_NAME, Variable, VariableType};
