//! Zarf Compose - import chains and component composition
//!
//! Resolves the `import` of each component into an [`ImportChain`],
//! migrates deprecated fields along the chain and flattens it into a single
//! component. Imported definitions come from a [`PackageSource`], which is
//! the local filesystem or an OCI registry.

pub mod chain;
pub mod compose;
pub mod error;
pub mod filter;
pub mod migrate;
pub mod oci;
pub mod paths;
pub mod source;
pub mod template;

pub use chain::{HEAD_LOCATION, ImportChain, Node};
pub use compose::{
    ComponentFailure, ComposedPackage, compose_components, fix_paths, record_build_metadata,
};
pub use error::{ComposeError, Result};
pub use filter::{host_architecture, is_compatible, resolve_architecture, strip_filters};
pub use migrate::{MIGRATIONS, PLURALIZE_SET_VARIABLE, SCRIPTS_TO_ACTIONS, migrate_component, record_migrations};
pub use oci::OciSource;
pub use source::{DEFAULT_OCI_TIMEOUT, DefaultSource, LocalSource, PackageSource, SourceRef};
pub use template::{
    COMPONENT_NAME_PLACEHOLDER, DEPRECATED_TEMPLATE_PREFIX, TEMPLATE_SUFFIX, VARIABLE_PREFIX,
    contains_placeholder, find_in_value, find_placeholders, placeholder_mappings,
    reload_component_name, substitute_in_value, substitute_placeholders,
};
