//! Flattening import chains into single components
//!
//! Nodes are overlaid from the tail (deepest import) to the head, so the
//! importing side wins for singly-valued fields while list fields accumulate.

use indexmap::IndexMap;

use zarf_core::{ActionSet, Chart, Component, Constant, InteractiveVariable, Manifest, Package};

use crate::chain::ImportChain;
use crate::error::{ComposeError, Result};
use crate::filter::{is_compatible, strip_filters};
use crate::migrate::record_migrations;
use crate::paths::{is_url, make_path_relative_to};
use crate::source::PackageSource;
use crate::template::contains_placeholder;

impl ImportChain {
    /// Collapse the chain into one component
    pub fn compose(&self) -> Result<Component> {
        if self.len() == 1 {
            return Ok(self.tail().component.clone());
        }

        let mut composed = Component::default();
        for node in self.nodes().iter().rev() {
            let mut overlay = node.component.clone();
            // remote skeleton sources are not materialized on disk
            if !node.is_remote() {
                fix_paths(&mut overlay, node.relative_to_head());
            }

            override_metadata(&mut composed, &overlay)?;
            override_deprecated(&mut composed, &overlay);
            override_resources(&mut composed, overlay.clone());
            override_actions(&mut composed, overlay);
        }
        Ok(composed)
    }

    /// Merge the chain's variables into the package's
    ///
    /// Definitions are taken from the deepest import to the head, then the
    /// package's own; the last definition of a name wins and keeps the
    /// position where the name first appeared.
    pub fn merge_variables(&self, existing: &[InteractiveVariable]) -> Vec<InteractiveVariable> {
        let stream = self
            .nodes()
            .iter()
            .rev()
            .flat_map(|n| n.variables().iter())
            .chain(existing.iter());
        merge_by_name(stream, |v| v.name())
    }

    /// Merge the chain's constants into the package's, same rules as variables
    pub fn merge_constants(&self, existing: &[Constant]) -> Vec<Constant> {
        let stream = self
            .nodes()
            .iter()
            .rev()
            .flat_map(|n| n.constants().iter())
            .chain(existing.iter());
        merge_by_name(stream, |c| c.name.as_str())
    }
}

fn merge_by_name<'a, T: Clone + 'a>(
    items: impl Iterator<Item = &'a T>,
    name: impl Fn(&T) -> &str,
) -> Vec<T> {
    let mut merged: IndexMap<String, T> = IndexMap::new();
    for item in items {
        merged.insert(name(item).to_string(), item.clone());
    }
    merged.into_values().collect()
}

/// Rebase an imported component's local paths onto the head package
pub fn fix_paths(component: &mut Component, relative_to_head: &str) {
    for chart in &mut component.charts {
        for values_file in &mut chart.values_files {
            *values_file = make_path_relative_to(values_file, relative_to_head);
        }
        if !chart.local_path.is_empty() {
            chart.local_path = make_path_relative_to(&chart.local_path, relative_to_head);
        }
    }

    for file in &mut component.files {
        file.source = make_path_relative_to(&file.source, relative_to_head);
    }

    for manifest in &mut component.manifests {
        for file in &mut manifest.files {
            *file = make_path_relative_to(file, relative_to_head);
        }
        for kustomization in &mut manifest.kustomizations {
            if !is_remote_kustomization(kustomization) {
                *kustomization = make_path_relative_to(kustomization, relative_to_head);
            }
        }
    }

    for injection in &mut component.data_injections {
        injection.source = make_path_relative_to(&injection.source, relative_to_head);
    }

    // deploy and remove actions run from the deploy location
    let on_create = &mut component.actions.on_create;
    let default_dir = on_create.defaults.dir.clone();
    for action in on_create.lists_mut().into_iter().flatten() {
        let dir = action.dir.as_deref().unwrap_or(&default_dir);
        action.dir = Some(make_path_relative_to(dir, relative_to_head));
    }
}

/// Kustomize accepts go-getter style remotes (`github.com/org/repo//dir?ref=v1`)
fn is_remote_kustomization(s: &str) -> bool {
    is_url(s) || s.contains("?ref=") || s.contains("//")
}

fn override_metadata(composed: &mut Component, overlay: &Component) -> Result<()> {
    composed.name = overlay.name.clone();
    composed.default = overlay.default;
    composed.required = overlay.required;

    if !overlay.description.is_empty() {
        composed.description = overlay.description.clone();
    }

    if !overlay.only.local_os.is_empty() {
        if !composed.only.local_os.is_empty() {
            return Err(ComposeError::LocalOsRedefined {
                name: composed.name.clone(),
                existing: composed.only.local_os.clone(),
                redefined: overlay.only.local_os.clone(),
            });
        }
        composed.only.local_os = overlay.only.local_os.clone();
    }
    Ok(())
}

fn override_deprecated(composed: &mut Component, overlay: &Component) {
    if !overlay.cosign_key_path.is_empty() {
        composed.cosign_key_path = overlay.cosign_key_path.clone();
    }
    composed.group = overlay.group.clone();

    // kept for older consumers of the built package
    let scripts = &mut composed.scripts;
    union_into(&mut scripts.prepare, overlay.scripts.prepare.clone());
    union_into(&mut scripts.before, overlay.scripts.before.clone());
    union_into(&mut scripts.after, overlay.scripts.after.clone());
    scripts.retry |= overlay.scripts.retry;
    scripts.show_output |= overlay.scripts.show_output;
    if overlay.scripts.timeout_seconds > 0 {
        scripts.timeout_seconds = overlay.scripts.timeout_seconds;
    }
}

fn override_resources(composed: &mut Component, overlay: Component) {
    union_into(&mut composed.data_injections, overlay.data_injections);
    union_into(&mut composed.files, overlay.files);
    union_into(&mut composed.images, overlay.images);
    union_into(&mut composed.repos, overlay.repos);

    for chart in overlay.charts {
        merge_chart(&mut composed.charts, chart);
    }
    for manifest in overlay.manifests {
        merge_manifest(&mut composed.manifests, manifest);
    }
}

fn merge_chart(charts: &mut Vec<Chart>, overlay: Chart) {
    match charts.iter_mut().find(|c| c.name == overlay.name) {
        Some(existing) => {
            if !overlay.namespace.is_empty() {
                existing.namespace = overlay.namespace;
            }
            if !overlay.release_name.is_empty() {
                existing.release_name = overlay.release_name;
            }
            existing.values_files.extend(overlay.values_files);
            existing.variables.extend(overlay.variables);
        }
        None => charts.push(overlay),
    }
}

fn merge_manifest(manifests: &mut Vec<Manifest>, overlay: Manifest) {
    match manifests.iter_mut().find(|m| m.name == overlay.name) {
        Some(existing) => {
            if !overlay.namespace.is_empty() {
                existing.namespace = overlay.namespace;
            }
            existing.files.extend(overlay.files);
            existing.kustomizations.extend(overlay.kustomizations);
        }
        None => manifests.push(overlay),
    }
}

fn override_actions(composed: &mut Component, overlay: Component) {
    let Component { actions, .. } = overlay;
    merge_action_set(&mut composed.actions.on_create, actions.on_create);
    merge_action_set(&mut composed.actions.on_deploy, actions.on_deploy);
    merge_action_set(&mut composed.actions.on_remove, actions.on_remove);
}

fn merge_action_set(composed: &mut ActionSet, overlay: ActionSet) {
    composed.defaults = overlay.defaults;
    union_into(&mut composed.before, overlay.before);
    union_into(&mut composed.after, overlay.after);
    union_into(&mut composed.on_success, overlay.on_success);
    union_into(&mut composed.on_failure, overlay.on_failure);
}

/// Append items not already present, preserving order
fn union_into<T: PartialEq>(into: &mut Vec<T>, from: Vec<T>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Failure to compose one top-level component
#[derive(Debug)]
pub struct ComponentFailure {
    /// Index of the component in the package
    pub index: usize,
    pub name: String,
    pub error: ComposeError,
}

/// Result of composing every component of a package
#[derive(Debug)]
pub struct ComposedPackage {
    /// The package with compatible components composed and variables merged
    pub package: Package,

    /// Deprecation warnings from migrations
    pub warnings: Vec<String>,

    /// Components whose import chain could not be composed
    pub failures: Vec<ComponentFailure>,
}

impl ComposedPackage {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Filter, resolve, migrate and compose every component of a package
///
/// A component whose chain fails is recorded in `failures` and left out of
/// the result; the remaining components are still composed.
pub fn compose_components(
    package: &Package,
    architecture: &str,
    flavor: &str,
    source: &dyn PackageSource,
) -> Result<ComposedPackage> {
    if architecture.is_empty() {
        return Err(ComposeError::MissingArchitecture);
    }

    let mut components = Vec::new();
    let mut warnings = Vec::new();
    let mut failures = Vec::new();
    let mut variables = package.variables.clone();
    let mut constants = package.constants.clone();

    for (index, component) in package.components.iter().enumerate() {
        if !is_compatible(component, architecture, flavor) {
            tracing::debug!(component = %component.name, "skipping incompatible component");
            continue;
        }

        let mut head = component.clone();
        strip_filters(&mut head);

        let (mut chain, chain_err) =
            ImportChain::build_partial(head, index, package, architecture, flavor, source);
        warnings.extend(import_placeholder_warnings(&chain));

        let result = match chain_err {
            Some(err) => Err(err),
            None => {
                let chain_warnings = chain.migrate(&package.build);
                chain.compose().map(|composed| (chain, chain_warnings, composed))
            }
        };

        match result {
            Ok((chain, chain_warnings, composed)) => {
                warnings.extend(chain_warnings);
                variables = chain.merge_variables(&variables);
                constants = chain.merge_constants(&constants);
                components.push(composed);
            }
            Err(error) => {
                tracing::warn!(component = %component.name, %error, "failed to compose component");
                failures.push(ComponentFailure {
                    index,
                    name: component.name.clone(),
                    error,
                });
            }
        }
    }

    let mut composed = package.clone();
    composed.components = components;
    composed.variables = variables;
    composed.constants = constants;

    Ok(ComposedPackage {
        package: composed,
        warnings,
        failures,
    })
}

/// Warn about placeholders in the imports of every resolved node
///
/// Imports are resolved before templates are filled, so these are read
/// literally.
fn import_placeholder_warnings(chain: &ImportChain) -> Vec<String> {
    chain
        .nodes()
        .iter()
        .flat_map(|node| {
            let import = &node.component.import;
            [("path", &import.path), ("url", &import.url)]
                .into_iter()
                .filter(|(_, value)| contains_placeholder(value))
                .map(move |(field, value)| {
                    format!(
                        "component {:?} in {}: Zarf does not evaluate variables at component.x.import.{} ({})",
                        node.component.name,
                        node.import_location(),
                        field,
                        value
                    )
                })
        })
        .collect()
}

/// Stamp build provenance onto a composed package
pub fn record_build_metadata(package: &mut Package, architecture: &str, flavor: &str) {
    let version = env!("CARGO_PKG_VERSION");
    let env = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
            .unwrap_or_default()
    };

    package.metadata.architecture = architecture.to_string();
    if package.is_init_config() {
        package.metadata.version = version.to_string();
    }

    let build = &mut package.build;
    build.user = env(&["USER", "USERNAME"]);
    build.terminal = env(&["HOSTNAME", "COMPUTERNAME"]);
    build.architecture = architecture.to_string();
    build.version = version.to_string();
    build.timestamp = chrono::Local::now().to_rfc2822();
    build.flavor = flavor.to_string();
    record_migrations(build);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LocalSource;
    use zarf_core::{Action, ComponentImport, File, Metadata, PACKAGE_FILE, PackageKind, Variable};

    fn write_package(dir: &std::path::Path, yaml: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(PACKAGE_FILE), yaml).unwrap();
    }

    fn two_node_chain(parent: Component, child: Component) -> ImportChain {
        let dir = tempfile::tempdir().unwrap();
        let child_pkg = Package {
            metadata: Metadata {
                name: "child".to_string(),
                ..Default::default()
            },
            components: vec![child],
            ..Default::default()
        };
        write_package(&dir.path().join("child"), &child_pkg.to_yaml().unwrap());

        let root = Package {
            metadata: Metadata {
                name: "root".to_string(),
                ..Default::default()
            },
            components: vec![parent.clone()],
            ..Default::default()
        };
        ImportChain::build(parent, 0, &root, "amd64", "", &LocalSource::new(dir.path())).unwrap()
    }

    fn parent(images: &[&str]) -> Component {
        Component {
            name: "web".to_string(),
            import: ComponentImport {
                path: "child".to_string(),
                ..Default::default()
            },
            images: images.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn child(images: &[&str]) -> Component {
        Component {
            name: "web".to_string(),
            description: "from child".to_string(),
            images: images.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_node_is_unchanged() {
        let c = child(&["nginx:1.25"]);
        let root = Package {
            metadata: Metadata {
                name: "root".to_string(),
                ..Default::default()
            },
            components: vec![c.clone()],
            ..Default::default()
        };
        let chain =
            ImportChain::build(c.clone(), 0, &root, "amd64", "", &LocalSource::new(".")).unwrap();
        assert_eq!(chain.compose().unwrap(), c);
    }

    #[test]
    fn test_lists_are_unioned() {
        let chain = two_node_chain(parent(&["a:1"]), child(&["b:1"]));
        let composed = chain.compose().unwrap();
        assert_eq!(composed.images, ["b:1", "a:1"]);

        let chain = two_node_chain(parent(&["a:1"]), child(&["a:1"]));
        assert_eq!(chain.compose().unwrap().images, ["a:1"]);
    }

    #[test]
    fn test_head_metadata_wins() {
        let mut p = parent(&[]);
        p.required = Some(true);
        let chain = two_node_chain(p, child(&[]));
        let composed = chain.compose().unwrap();

        assert_eq!(composed.name, "web");
        assert!(composed.is_required());
        assert_eq!(composed.description, "from child");
        assert!(composed.import.is_empty());
    }

    #[test]
    fn test_child_paths_are_rebased() {
        let mut c = child(&[]);
        c.files.push(File {
            source: "files/config.txt".to_string(),
            target: "/etc/config.txt".to_string(),
            ..Default::default()
        });
        c.files.push(File {
            source: "https://example.com/remote.txt".to_string(),
            target: "/tmp/remote.txt".to_string(),
            ..Default::default()
        });
        c.charts.push(Chart {
            name: "app".to_string(),
            local_path: "chart".to_string(),
            values_files: vec!["values.yaml".to_string()],
            ..Default::default()
        });
        c.actions.on_create.before.push(Action::command("make"));

        let composed = two_node_chain(parent(&[]), c).compose().unwrap();
        assert_eq!(composed.files[0].source, "child/files/config.txt");
        assert_eq!(composed.files[1].source, "https://example.com/remote.txt");
        assert_eq!(composed.charts[0].local_path, "child/chart");
        assert_eq!(composed.charts[0].values_files, ["child/values.yaml"]);
        assert_eq!(composed.actions.on_create.before[0].dir.as_deref(), Some("child"));
    }

    #[test]
    fn test_charts_merge_by_name() {
        let mut c = child(&[]);
        c.charts.push(Chart {
            name: "app".to_string(),
            namespace: "child-ns".to_string(),
            url: "https://charts.example.com".to_string(),
            values_files: vec!["https://example.com/base.yaml".to_string()],
            ..Default::default()
        });
        let mut p = parent(&[]);
        p.charts.push(Chart {
            name: "app".to_string(),
            namespace: "override-ns".to_string(),
            values_files: vec!["https://example.com/extra.yaml".to_string()],
            ..Default::default()
        });

        let composed = two_node_chain(p, c).compose().unwrap();
        assert_eq!(composed.charts.len(), 1);
        assert_eq!(composed.charts[0].namespace, "override-ns");
        assert_eq!(
            composed.charts[0].values_files,
            ["https://example.com/base.yaml", "https://example.com/extra.yaml"]
        );
    }

    #[test]
    fn test_local_os_cannot_be_redefined() {
        let mut c = child(&[]);
        c.only.local_os = "linux".to_string();
        let mut p = parent(&[]);
        p.only.local_os = "darwin".to_string();

        let err = two_node_chain(p, c).compose().unwrap_err();
        assert!(matches!(err, ComposeError::LocalOsRedefined { .. }));
    }

    #[test]
    fn test_merge_variables_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_package(
            &dir.path().join("child"),
            r#"
kind: ZarfPackageConfig
metadata:
  name: child
variables:
  - name: SHARED
    default: from-child
  - name: CHILD_ONLY
constants:
  - name: VERSION
    value: "1"
components:
  - name: web
"#,
        );
        let mut root = Package {
            kind: Some(PackageKind::ZarfPackageConfig),
            metadata: Metadata {
                name: "root".to_string(),
                ..Default::default()
            },
            components: vec![parent(&[])],
            ..Default::default()
        };
        root.variables.push(InteractiveVariable {
            variable: Variable::new("SHARED"),
            default: "from-root".to_string(),
            ..Default::default()
        });

        let chain = ImportChain::build(
            root.components[0].clone(),
            0,
            &root,
            "amd64",
            "",
            &LocalSource::new(dir.path()),
        )
        .unwrap();
        let vars = chain.merge_variables(&root.variables);
        let names: Vec<&str> = vars.iter().map(|v| v.name()).collect();
        assert_eq!(names, ["SHARED", "CHILD_ONLY"]);
        assert_eq!(vars[0].default, "from-root");

        let consts = chain.merge_constants(&root.constants);
        assert_eq!(consts.len(), 1);
        assert_eq!(consts[0].value, "1");
    }

    #[test]
    fn test_compose_components_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        write_package(
            &dir.path().join("lib"),
            "kind: ZarfPackageConfig\nmetadata:\n  name: lib\ncomponents:\n  - name: good\n    images:\n      - lib:1.0\n",
        );
        let root = Package::from_yaml(
            r#"
kind: ZarfPackageConfig
metadata:
  name: root
components:
  - name: good
    import:
      path: lib
    images:
      - root:1.0
  - name: broken
    import:
      path: missing
  - name: arm-only
    only:
      cluster:
        architecture: arm64
  - name: plain
    only:
      cluster:
        architecture: amd64
"#,
        )
        .unwrap();

        let result =
            compose_components(&root, "amd64", "", &LocalSource::new(dir.path())).unwrap();
        let names: Vec<&str> = result.package.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["good", "plain"]);
        assert_eq!(result.package.components[0].images, ["lib:1.0", "root:1.0"]);
        assert!(result.package.components[1].only.is_empty());

        assert!(!result.is_complete());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert_eq!(result.failures[0].name, "broken");
    }

    #[test]
    fn test_compose_components_warns_on_import_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        write_package(
            &dir.path().join("lib"),
            "kind: ZarfPackageConfig\nmetadata:\n  name: lib\ncomponents:\n  - name: db\n    import:\n      path: \"###ZARF_PKG_VAR_DB_DIR###\"\n",
        );
        let root = Package::from_yaml(
            r####"
kind: ZarfPackageConfig
metadata:
  name: root
components:
  - name: web
    import:
      path: "###ZARF_PKG_TMPL_PATH###"
  - name: db
    import:
      path: lib
"####,
        )
        .unwrap();

        let result =
            compose_components(&root, "amd64", "", &LocalSource::new(dir.path())).unwrap();
        assert_eq!(
            result.warnings,
            [
                "component \"web\" in .: Zarf does not evaluate variables at component.x.import.path (###ZARF_PKG_TMPL_PATH###)",
                "component \"db\" in lib: Zarf does not evaluate variables at component.x.import.path (###ZARF_PKG_VAR_DB_DIR###)",
            ]
        );
        assert_eq!(result.failures.len(), 2);
        assert!(result.failures[0].error.to_string().contains("###ZARF_PKG_TMPL_PATH###"));
    }

    #[test]
    fn test_compose_components_requires_architecture() {
        let root = Package::default();
        let err = compose_components(&root, "", "", &LocalSource::new(".")).unwrap_err();
        assert!(matches!(err, ComposeError::MissingArchitecture));
    }

    #[test]
    fn test_record_build_metadata() {
        let mut pkg = Package {
            kind: Some(PackageKind::ZarfInitConfig),
            ..Default::default()
        };
        record_build_metadata(&mut pkg, "arm64", "vanilla");

        assert_eq!(pkg.metadata.architecture, "arm64");
        assert_eq!(pkg.metadata.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(pkg.build.architecture, "arm64");
        assert_eq!(pkg.build.flavor, "vanilla");
        assert!(!pkg.build.timestamp.is_empty());
        assert_eq!(pkg.build.migrations.len(), 2);
    }
}
