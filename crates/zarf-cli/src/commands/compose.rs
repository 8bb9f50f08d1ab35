//! Compose command - flatten imports into a single package definition

use console::style;
use indexmap::IndexMap;
use std::path::Path;

use zarf_compose::{
    DEPRECATED_TEMPLATE_PREFIX, DefaultSource, VARIABLE_PREFIX, compose_components,
    placeholder_mappings, record_build_metadata, reload_component_name, resolve_architecture,
    substitute_placeholders,
};
use zarf_core::Package;

use crate::config::Config;
use crate::error::{CliError, Result};

pub struct ComposeArgs<'a> {
    pub path: &'a Path,
    pub set: &'a [String],
    pub flavor: Option<String>,
    pub architecture: Option<String>,
    pub output: Option<&'a Path>,
}

pub fn run(args: ComposeArgs<'_>, config: &Config) -> Result<()> {
    let package = Package::from_dir(args.path)?;
    let architecture = resolve_architecture(
        config.architecture(args.architecture).as_deref(),
        &package.metadata.architecture,
    );
    let flavor = config.flavor(args.flavor);
    let set_variables = config.set_variables(args.set)?;

    eprintln!(
        "{} Composing {:?} for {}{}",
        style("→").blue(),
        package.metadata.name,
        architecture,
        if flavor.is_empty() {
            String::new()
        } else {
            format!(" ({})", flavor)
        }
    );

    let source = DefaultSource::new(args.path).with_oci_timeout(config.oci_timeout());
    let composed = compose_components(&package, &architecture, &flavor, &source)?;

    for warning in &composed.warnings {
        eprintln!("  {} {}", style("⚠").yellow(), warning);
    }
    if !composed.is_complete() {
        for failure in &composed.failures {
            eprintln!(
                "  {} .components.[{}] {:?}: {}",
                style("✗").red(),
                failure.index,
                failure.name,
                failure.error
            );
        }
        return Err(CliError::compose(format!(
            "{} component(s) could not be composed",
            composed.failures.len()
        )));
    }

    let mut package = composed.package;
    fill_templates(&mut package, &set_variables)?;
    record_build_metadata(&mut package, &architecture, &flavor);
    package.validate()?;

    let yaml = package.to_yaml()?;
    match args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, yaml)?;
            eprintln!(
                "{} Wrote {} component(s) to {}",
                style("✓").green().bold(),
                package.components.len(),
                path.display()
            );
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

fn fill_templates(package: &mut Package, set_variables: &IndexMap<String, String>) -> Result<()> {
    let mut mappings = placeholder_mappings(VARIABLE_PREFIX, set_variables);
    mappings.extend(placeholder_mappings(DEPRECATED_TEMPLATE_PREFIX, set_variables));

    for component in &mut package.components {
        reload_component_name(component)?;
        substitute_placeholders(component, &mappings)?;
    }
    Ok(())
}
