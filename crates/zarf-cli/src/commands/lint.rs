//! Lint command - report findings for a package definition

use console::style;
use std::path::Path;

use zarf_compose::DefaultSource;
use zarf_core::{EmbeddedSchema, PACKAGE_FILE};
use zarf_lint::{CreateOptions, Severity, Validator};

use crate::config::Config;
use crate::display::FindingsReporter;
use crate::error::{CliError, Result};

pub struct LintArgs<'a> {
    pub path: &'a Path,
    pub set: &'a [String],
    pub flavor: Option<String>,
    pub architecture: Option<String>,
    pub errors_only: bool,
    pub json: bool,
}

pub fn run(args: LintArgs<'_>, config: &Config) -> Result<()> {
    let opts = CreateOptions {
        base_dir: args.path.to_path_buf(),
        flavor: config.flavor(args.flavor),
        set_variables: config.set_variables(args.set)?,
        architecture: config.architecture(args.architecture),
    };
    let source = DefaultSource::new(args.path).with_oci_timeout(config.oci_timeout());

    let mut validator = Validator::new();
    validator.extend(zarf_lint::validate(&opts, &source, &EmbeddedSchema)?);
    let (errors, warnings) = validator.counts();

    if args.json {
        let output = serde_json::json!({
            "valid": !validator.has_errors(),
            "errors": errors,
            "warnings": warnings,
            "findings": validator.findings(),
        });
        let rendered = serde_json::to_string_pretty(&output).map_err(|e| CliError::Internal {
            message: e.to_string(),
        })?;
        println!("{}", rendered);
    } else {
        let threshold = if args.errors_only {
            Severity::Error
        } else {
            Severity::Warning
        };
        let name = package_name(args.path);
        FindingsReporter::new().render(validator.findings(), threshold, args.path, &name)?;
    }

    if validator.has_errors() {
        return Err(CliError::lint_failed(errors, warnings));
    }

    if !args.json && warnings > 0 {
        println!();
        println!(
            "{} Linting passed with {} warning(s)",
            style("⚠").yellow().bold(),
            warnings
        );
    }
    Ok(())
}

/// `metadata.name` of the definition, read loosely so malformed files still have a name
fn package_name(dir: &Path) -> String {
    std::fs::read_to_string(dir.join(PACKAGE_FILE))
        .ok()
        .and_then(|content| serde_yaml::from_str::<serde_yaml::Value>(&content).ok())
        .and_then(|tree| {
            tree.get("metadata")
                .and_then(|m| m.get("name"))
                .and_then(serde_yaml::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}
