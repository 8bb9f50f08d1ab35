//! Linting a package definition
//!
//! Every compatible component is resolved through its import chain and each
//! node is checked in its own package's terms, so findings point back at the
//! sub-package that owns the offending value. The package is then validated
//! against the JSON schema in its composed, templated form.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::path::PathBuf;

use zarf_compose::paths::display_path;
use zarf_compose::{
    COMPONENT_NAME_PLACEHOLDER, DEPRECATED_TEMPLATE_PREFIX, ImportChain, PackageSource,
    TEMPLATE_SUFFIX, VARIABLE_PREFIX, find_placeholders, is_compatible, placeholder_mappings,
    reload_component_name, resolve_architecture, strip_filters, substitute_in_value,
    substitute_placeholders,
};
use zarf_core::{Component, FileLoader, PACKAGE_FILE, Package, SchemaValidator};

use crate::checks::{check_component, check_for_var_in_component_import};
use crate::error::{LintError, Result};
use crate::finding::Finding;
use crate::validator::Validator;

/// Finding for placeholders that have no value during lint
pub const UNSET_VARIABLE_WARNING: &str =
    "There are templates that are not set and won't be evaluated during lint";

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\b\d+\b)").expect("valid segment regex"));

/// Inputs of a lint run
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Directory holding the package's `zarf.yaml`
    pub base_dir: PathBuf,

    pub flavor: String,

    /// Values for package templates, keyed without prefix or suffix
    pub set_variables: IndexMap<String, String>,

    /// Overrides the package's architecture
    pub architecture: Option<String>,
}

/// Findings and composed components from linting every component
#[derive(Debug, Default)]
pub struct LintedComponents {
    pub findings: Vec<Finding>,

    /// Index in the package and composed form of each importing component
    /// whose chain resolved completely
    pub composed: Vec<(usize, Component)>,
}

/// Lint the package at `opts.base_dir`
pub fn validate(
    opts: &CreateOptions,
    source: &dyn PackageSource,
    schema_loader: &dyn FileLoader,
) -> Result<Vec<Finding>> {
    let path = opts.base_dir.join(PACKAGE_FILE);
    let shown = display_path(&path);
    tracing::debug!(path = %shown, "linting package definition");

    let content = std::fs::read_to_string(&path).map_err(|source| LintError::ReadDefinition {
        path: shown.clone(),
        source,
    })?;
    let mut tree: Value =
        serde_yaml::from_str(&content).map_err(|source| LintError::ParseDefinition {
            path: shown.clone(),
            source,
        })?;

    let mut validator = Validator::new();
    match serde_yaml::from_value::<Package>(tree.clone()) {
        Ok(package) => {
            let linted = lint_components(&package, opts, source)?;
            validator.extend(linted.findings);
            replace_components(&mut tree, linted.composed)?;
            fill_tree_templates(&mut tree, &opts.set_variables);
        }
        Err(error) => {
            // the schema still reports where the structure is wrong
            tracing::debug!(%error, "definition does not match the package model");
        }
    }

    let json = serde_json::to_value(&tree)?;
    validator.extend(validate_schema(&json, schema_loader)?);
    Ok(validator.into_findings())
}

/// Lint every compatible component through its import chain
pub fn lint_components(
    package: &Package,
    opts: &CreateOptions,
    source: &dyn PackageSource,
) -> Result<LintedComponents> {
    let architecture = resolve_architecture(opts.architecture.as_deref(), &package.metadata.architecture);
    let mut linted = LintedComponents::default();

    for (index, component) in package.components.iter().enumerate() {
        if !is_compatible(component, &architecture, &opts.flavor) {
            continue;
        }

        let mut head = component.clone();
        strip_filters(&mut head);
        let (chain, chain_err) =
            ImportChain::build_partial(head, index, package, &architecture, &opts.flavor, source);

        match chain_err {
            Some(err) => {
                let field = if component.import.url.is_empty() { "path" } else { "url" };
                linted.findings.push(
                    Finding::error(err.to_string())
                        .at(format!(".components.[{}].import.{}", index, field)),
                );
            }
            None if chain.len() > 1 => match compose_for_schema(&chain, package) {
                Ok(composed) => linted.composed.push((index, composed)),
                Err(err) => linted
                    .findings
                    .push(Finding::error(err.to_string()).at(format!(".components.[{}]", index))),
            },
            None => {}
        }

        for node in chain.nodes() {
            let mut findings = check_for_var_in_component_import(&node.component, node.index());

            let mut templated = node.component.clone();
            findings.extend(fill_component_template(&mut templated, node.index(), opts)?);
            findings.extend(check_component(&templated, node.index()));

            linted.findings.extend(
                findings
                    .into_iter()
                    .map(|f| f.from_package(node.original_package_name(), node.import_location())),
            );
        }
    }

    Ok(linted)
}

fn compose_for_schema(chain: &ImportChain, package: &Package) -> zarf_compose::Result<Component> {
    let mut chain = chain.clone();
    chain.migrate(&package.build);
    chain.compose()
}

/// Fill a component's templates with the user's values
///
/// Returns a warning for every deprecated placeholder and for every
/// placeholder without a value.
pub fn fill_component_template(
    component: &mut Component,
    index: usize,
    opts: &CreateOptions,
) -> Result<Vec<Finding>> {
    reload_component_name(component)?;

    let path = format!(".components.[{}]", index);
    let mut findings = Vec::new();
    let mut mappings = IndexMap::new();

    for (prefix, deprecated) in [(DEPRECATED_TEMPLATE_PREFIX, true), (VARIABLE_PREFIX, false)] {
        for key in find_placeholders(component, prefix, TEMPLATE_SUFFIX)? {
            if deprecated {
                findings.push(
                    Finding::warning(format!(
                        "Package template {:?} is using the deprecated syntax {}{}{}. This will be removed in Zarf v1.0.0. Please update to {}{}{}.",
                        key, DEPRECATED_TEMPLATE_PREFIX, key, TEMPLATE_SUFFIX, VARIABLE_PREFIX, key, TEMPLATE_SUFFIX
                    ))
                    .at(&path),
                );
            }
            if !opts.set_variables.contains_key(&key) {
                findings.push(Finding::warning(UNSET_VARIABLE_WARNING).at(&path).with_item(key));
            }
        }
        mappings.extend(placeholder_mappings(prefix, &opts.set_variables));
    }

    substitute_placeholders(component, &mappings)?;
    Ok(findings)
}

/// Schema violations of a package tree as error findings
pub fn validate_schema(tree: &serde_json::Value, loader: &dyn FileLoader) -> Result<Vec<Finding>> {
    let validator = SchemaValidator::from_loader(loader)?;
    let result = validator.validate(tree);
    Ok(result
        .errors
        .into_iter()
        .map(|e| Finding::error(e.message).at(make_field_path_yq_compat(&e.path)))
        .collect())
}

/// `components.1.images.2` -> `.components.[1].images.[2]`; `(root)` is kept
pub fn make_field_path_yq_compat(field: &str) -> String {
    if field == "(root)" {
        return field.to_string();
    }
    format!(".{}", NUMERIC_SEGMENT.replace_all(field, "[${1}]"))
}

fn replace_components(tree: &mut Value, composed: Vec<(usize, Component)>) -> Result<()> {
    let Some(Value::Sequence(components)) = tree.get_mut("components") else {
        return Ok(());
    };
    for (index, component) in composed {
        if let Some(slot) = components.get_mut(index) {
            *slot = serde_yaml::to_value(&component).map_err(|source| LintError::ParseDefinition {
                path: format!("components.{}", index),
                source,
            })?;
        }
    }
    Ok(())
}

/// Template the whole tree the way a build would
fn fill_tree_templates(tree: &mut Value, set_variables: &IndexMap<String, String>) {
    if let Some(Value::Sequence(components)) = tree.get_mut("components") {
        for component in components {
            let Some(name) = component.get("name").and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            let mut own_name = IndexMap::new();
            own_name.insert(COMPONENT_NAME_PLACEHOLDER.to_string(), name);
            substitute_in_value(component, &own_name);
        }
    }

    let mut mappings = placeholder_mappings(VARIABLE_PREFIX, set_variables);
    mappings.extend(placeholder_mappings(DEPRECATED_TEMPLATE_PREFIX, set_variables));
    substitute_in_value(tree, &mappings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use zarf_compose::LocalSource;
    use zarf_core::EmbeddedSchema;

    fn write(dir: &std::path::Path, yaml: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(PACKAGE_FILE), yaml).unwrap();
    }

    fn opts(dir: &std::path::Path) -> CreateOptions {
        CreateOptions {
            base_dir: dir.to_path_buf(),
            architecture: Some("amd64".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_make_field_path_yq_compat() {
        assert_eq!(
            make_field_path_yq_compat("components12.12.import.path"),
            ".components12.[12].import.path"
        );
        assert_eq!(make_field_path_yq_compat("components.1.images.2"), ".components.[1].images.[2]");
        assert_eq!(make_field_path_yq_compat("(root)"), "(root)");
    }

    #[test]
    fn test_fill_component_template() {
        let mut component = Component {
            name: "templated".to_string(),
            images: vec![
                "nginx:###ZARF_PKG_TMPL_NGINX_TAG###".to_string(),
                "redis:###ZARF_PKG_VAR_REDIS_TAG###".to_string(),
            ],
            ..Default::default()
        };
        let mut o = CreateOptions::default();
        o.set_variables.insert("NGINX_TAG".to_string(), "1.25".to_string());

        let findings = fill_component_template(&mut component, 0, &o).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(
            findings[0].description,
            "Package template \"NGINX_TAG\" is using the deprecated syntax ###ZARF_PKG_TMPL_NGINX_TAG###. This will be removed in Zarf v1.0.0. Please update to ###ZARF_PKG_VAR_NGINX_TAG###."
        );
        assert_eq!(findings[1].description, UNSET_VARIABLE_WARNING);
        assert_eq!(findings[1].item, "REDIS_TAG");
        assert_eq!(component.images[0], "nginx:1.25");
    }

    #[test]
    fn test_missing_import_and_unpinned_image() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            r#"
kind: ZarfPackageConfig
metadata:
  name: broken-import
components:
  - name: import-test
    import:
      path: fake-path
    images:
      - unpinned:latest
"#,
        );

        let findings = validate(&opts(dir.path()), &LocalSource::new(dir.path()), &EmbeddedSchema).unwrap();

        let not_found = std::fs::read(dir.path().join("fake-path").join(PACKAGE_FILE))
            .unwrap_err()
            .to_string();
        assert_eq!(findings[0].yq_path, ".components.[0].import.path");
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].description.contains("fake-path/zarf.yaml"));
        assert!(findings[0].description.contains(&not_found));

        let unpinned = findings.iter().find(|f| f.item == "unpinned:latest").unwrap();
        assert_eq!(unpinned.severity, Severity::Warning);
        assert_eq!(unpinned.yq_path, ".components.[0].images.[0]");
        assert_eq!(unpinned.package_path_override, ".");
        assert_eq!(unpinned.package_name_override, "broken-import");
    }

    #[test]
    fn test_failed_import_does_not_stop_later_components() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            r#"
kind: ZarfPackageConfig
metadata:
  name: isolated
components:
  - name: import-test
    import:
      path: fake-path
  - name: repos
    repos:
      - https://github.com/org/app
"#,
        );

        let findings = validate(&opts(dir.path()), &LocalSource::new(dir.path()), &EmbeddedSchema).unwrap();
        assert_eq!(findings.len(), 2, "{:?}", findings);

        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].yq_path, ".components.[0].import.path");

        assert_eq!(findings[1].severity, Severity::Warning);
        assert_eq!(findings[1].description, "Unpinned repository");
        assert_eq!(findings[1].yq_path, ".components.[1].repos.[0]");
        assert_eq!(findings[1].item, "https://github.com/org/app");
    }

    #[test]
    fn test_imported_findings_carry_provenance() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("lib"),
            r#"
kind: ZarfPackageConfig
metadata:
  name: library
components:
  - name: other
  - name: web
    repos:
      - https://github.com/org/web
"#,
        );
        write(
            dir.path(),
            r#"
kind: ZarfPackageConfig
metadata:
  name: app
components:
  - name: web
    import:
      path: lib
"#,
        );

        let findings = validate(&opts(dir.path()), &LocalSource::new(dir.path()), &EmbeddedSchema).unwrap();
        assert_eq!(findings.len(), 1, "{:?}", findings);
        let f = &findings[0];
        assert_eq!(f.description, "Unpinned repository");
        assert_eq!(f.yq_path, ".components.[1].repos.[0]");
        assert_eq!(f.package_name_override, "library");
        assert_eq!(f.package_path_override, "lib");
    }

    #[test]
    fn test_incompatible_components_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            r#"
kind: ZarfPackageConfig
metadata:
  name: arch
components:
  - name: arm
    only:
      cluster:
        architecture: arm64
    images:
      - nginx:1.25
"#,
        );
        let findings = validate(&opts(dir.path()), &LocalSource::new(dir.path()), &EmbeddedSchema).unwrap();
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_schema_findings_use_yq_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            r#"
kind: ZarfPackageConfig
metadata:
  name: schema
components:
  - name: ok
  - name: Bad_Name
"#,
        );
        let findings = validate(&opts(dir.path()), &LocalSource::new(dir.path()), &EmbeddedSchema).unwrap();
        assert!(
            findings
                .iter()
                .any(|f| f.yq_path == ".components.[1].name" && f.severity == Severity::Error),
            "{:?}",
            findings
        );
    }

    #[test]
    fn test_unknown_field_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            r#"
kind: ZarfPackageConfig
metadata:
  name: typo
components:
  - name: web
    imagez:
      - nginx:1.25
"#,
        );
        let findings = validate(&opts(dir.path()), &LocalSource::new(dir.path()), &EmbeddedSchema).unwrap();
        assert_eq!(findings.len(), 1, "{:?}", findings);
        assert_eq!(findings[0].yq_path, ".components.[0]");
        assert!(findings[0].description.contains("imagez"));
    }

    #[test]
    fn test_missing_definition_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate(&opts(dir.path()), &LocalSource::new(dir.path()), &EmbeddedSchema).unwrap_err();
        assert!(matches!(err, LintError::ReadDefinition { .. }));
    }
}
