//! Zarf Lint - findings for package definitions
//!
//! Lints each component through its import chain (pinning checks, template
//! usage) and validates the composed package against the JSON schema.
//! Findings carry a yq-style path and the sub-package they come from.

pub mod checks;
pub mod error;
pub mod finding;
pub mod lint;
pub mod validator;

pub use checks::{
    check_component, check_for_var_in_component_import, is_pinned_image, is_pinned_repo,
};
pub use error::{LintError, Result};
pub use finding::{Finding, Severity, group_findings_by_path, has_errors, has_severity};
pub use lint::{
    CreateOptions, LintedComponents, UNSET_VARIABLE_WARNING, fill_component_template,
    lint_components, make_field_path_yq_compat, validate, validate_schema,
};
pub use validator::{Validator, count_by_severity};
