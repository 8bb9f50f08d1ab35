//! Component definitions
//!
//! A component is the unit of selection inside a package. It may pull its
//! content from another package through `import`, in which case the import
//! chain is resolved and flattened before anything else looks at it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ValidationErrors;
use crate::package::is_false;
use crate::variables::Variable;

/// One package component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Unique name within the package
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Selected by default in interactive prompts
    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,

    /// Always deployed; absent means optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Filters deciding where this component applies
    #[serde(default, skip_serializing_if = "ComponentOnly::is_empty")]
    pub only: ComponentOnly,

    /// Deprecated: mutually exclusive selection group
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    /// Deprecated: key used to verify remote files
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cosign_key_path: String,

    /// Pull this component's content from another package
    #[serde(default, skip_serializing_if = "ComponentImport::is_empty")]
    pub import: ComponentImport,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<Manifest>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<Chart>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_injections: Vec<DataInjection>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,

    /// Container images to mirror
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Git repositories to mirror
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<String>,

    /// Deprecated: replaced by `actions`
    #[serde(default, skip_serializing_if = "Scripts::is_empty")]
    pub scripts: Scripts,

    #[serde(default, skip_serializing_if = "Actions::is_empty")]
    pub actions: Actions,
}

impl Component {
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    /// Name of the component to look up in the imported package
    pub fn import_name(&self) -> &str {
        if self.import.name.is_empty() {
            &self.name
        } else {
            &self.import.name
        }
    }

    pub fn has_import(&self) -> bool {
        !self.import.path.is_empty() || !self.import.url.is_empty()
    }

    /// Check the import definition of a component that imports another
    pub fn validate_import(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        let path = &self.import.path;
        let url = &self.import.url;
        let invalid = |reason: &str| {
            format!("invalid imported definition for {}: {}", self.name, reason)
        };

        if path.is_empty() && url.is_empty() {
            errs.push(invalid("neither a path nor a URL was provided"));
        }
        if !path.is_empty() && !url.is_empty() {
            errs.push(invalid("both a path and a URL were provided"));
        }
        if url.is_empty() && !path.is_empty() && Path::new(path).is_absolute() {
            errs.push(invalid("path cannot be an absolute path"));
        }
        if !url.is_empty() && path.is_empty() && !is_oci_url(url) {
            errs.push(invalid("URL is not a valid OCI URL"));
        }
        errs.into_result()
    }
}

/// Whether a string uses the `oci://` scheme
pub fn is_oci_url(s: &str) -> bool {
    s.strip_prefix("oci://").is_some_and(|rest| !rest.is_empty())
}

/// Filters restricting where a component applies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOnly {
    /// Operating system of the machine running the deploy
    #[serde(default, rename = "localOS", skip_serializing_if = "String::is_empty")]
    pub local_os: String,

    #[serde(default, skip_serializing_if = "OnlyCluster::is_empty")]
    pub cluster: OnlyCluster,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flavor: String,
}

impl ComponentOnly {
    pub fn is_empty(&self) -> bool {
        self.local_os.is_empty() && self.cluster.is_empty() && self.flavor.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlyCluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distros: Vec<String>,
}

impl OnlyCluster {
    pub fn is_empty(&self) -> bool {
        self.architecture.is_empty() && self.distros.is_empty()
    }
}

/// Reference to a component in another package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentImport {
    /// Component to import when it differs from the importing component's name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Relative directory containing the imported `zarf.yaml`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// `oci://` reference to a published skeleton package
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl ComponentImport {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.path.is_empty() && self.url.is_empty()
    }
}

/// A Helm chart to deploy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub local_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub release_name: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub no_wait: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_files: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<ChartVariable>,
}

/// Maps a package variable onto a chart value path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVariable {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub path: String,
}

/// Raw manifests or kustomizations to deploy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub kustomize_allow_any_directory: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kustomizations: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub no_wait: bool,
}

/// A file carried in the package and placed on the deploying machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Local path or remote URL
    pub source: String,

    /// Expected SHA-256 of the source
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shasum: String,

    pub target: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub executable: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symlinks: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extract_path: String,
}

/// Data pushed into a running container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInjection {
    pub source: String,

    pub target: DataInjectionTarget,

    #[serde(default, skip_serializing_if = "is_false")]
    pub compress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInjectionTarget {
    pub namespace: String,
    pub selector: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,

    pub path: String,
}

/// Lifecycle hooks of a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actions {
    #[serde(default, skip_serializing_if = "ActionSet::is_empty")]
    pub on_create: ActionSet,

    #[serde(default, skip_serializing_if = "ActionSet::is_empty")]
    pub on_deploy: ActionSet,

    #[serde(default, skip_serializing_if = "ActionSet::is_empty")]
    pub on_remove: ActionSet,
}

impl Actions {
    pub fn is_empty(&self) -> bool {
        self.on_create.is_empty() && self.on_deploy.is_empty() && self.on_remove.is_empty()
    }

    pub fn sets(&self) -> [&ActionSet; 3] {
        [&self.on_create, &self.on_deploy, &self.on_remove]
    }

    pub fn sets_mut(&mut self) -> [&mut ActionSet; 3] {
        [&mut self.on_create, &mut self.on_deploy, &mut self.on_remove]
    }
}

/// Hooks for one lifecycle stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSet {
    #[serde(default, skip_serializing_if = "ActionDefaults::is_empty")]
    pub defaults: ActionDefaults,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<Action>,
}

impl ActionSet {
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
            && self.before.is_empty()
            && self.after.is_empty()
            && self.on_success.is_empty()
            && self.on_failure.is_empty()
    }

    /// Every hook list of the stage
    pub fn lists(&self) -> [&Vec<Action>; 4] {
        [&self.before, &self.after, &self.on_success, &self.on_failure]
    }

    pub fn lists_mut(&mut self) -> [&mut Vec<Action>; 4] {
        [
            &mut self.before,
            &mut self.after,
            &mut self.on_success,
            &mut self.on_failure,
        ]
    }
}

/// Settings applied to every action of a stage unless overridden
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefaults {
    #[serde(default, skip_serializing_if = "is_false")]
    pub mute: bool,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_total_seconds: i64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_retries: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<Shell>,
}

impl ActionDefaults {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Shell to run commands with, per operating system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shell {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub windows: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub linux: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub darwin: String,
}

/// A single lifecycle hook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_seconds: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cmd: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<Shell>,

    /// Deprecated: replaced by `setVariables`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub set_variable: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_variables: Vec<Variable>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<ActionWait>,
}

impl Action {
    /// A plain command action
    pub fn command(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Default::default()
        }
    }
}

/// Block until a cluster resource or a network endpoint is ready
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionWait {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<WaitCluster>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<WaitNetwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitCluster {
    pub kind: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitNetwork {
    pub protocol: String,
    pub address: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub code: i64,
}

/// Deprecated shell scripts, superseded by actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scripts {
    #[serde(default, skip_serializing_if = "is_false")]
    pub show_output: bool,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub timeout_seconds: i64,

    #[serde(default, skip_serializing_if = "is_false")]
    pub retry: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepare: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Scripts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_commands(&self) -> bool {
        !self.prepare.is_empty() || !self.before.is_empty() || !self.after.is_empty()
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn importing(name: &str, path: &str, url: &str) -> Component {
        Component {
            name: name.to_string(),
            import: ComponentImport {
                path: path.to_string(),
                url: url.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_import_name() {
        let mut c = importing("web", "common", "");
        assert_eq!(c.import_name(), "web");

        c.import.name = "nginx".to_string();
        assert_eq!(c.import_name(), "nginx");
    }

    #[test]
    fn test_validate_import() {
        assert!(importing("ok", "relative/dir", "").validate_import().is_ok());
        assert!(importing("ok", "", "oci://ghcr.io/org/pkg:1.0.0").validate_import().is_ok());

        let err = importing("none", "", "").validate_import().unwrap_err();
        assert_eq!(
            err.messages(),
            ["invalid imported definition for none: neither a path nor a URL was provided"]
        );

        let err = importing("both", "dir", "oci://x/y").validate_import().unwrap_err();
        assert!(err.messages()[0].contains("both a path and a URL"));

        let err = importing("abs", "/abs/path", "").validate_import().unwrap_err();
        assert!(err.messages()[0].contains("absolute"));

        let err = importing("http", "", "https://example.com/pkg").validate_import().unwrap_err();
        assert!(err.messages()[0].contains("not a valid OCI URL"));
    }

    #[test]
    fn test_component_yaml_shape() {
        let yaml = r#"
name: podinfo
required: true
only:
  localOS: linux
  cluster:
    architecture: arm64
  flavor: upstream
import:
  path: ../common
actions:
  onDeploy:
    before:
      - cmd: echo hi
        setVariable: GREETING
    after:
      - wait:
          cluster:
            kind: pod
            name: podinfo
"#;
        let c: Component = serde_yaml::from_str(yaml).unwrap();
        assert!(c.is_required());
        assert!(c.has_import());
        assert_eq!(c.only.local_os, "linux");
        assert_eq!(c.only.cluster.architecture, "arm64");
        assert_eq!(c.actions.on_deploy.before[0].set_variable, "GREETING");
        assert!(c.actions.on_deploy.after[0].wait.as_ref().unwrap().cluster.is_some());

        let out = serde_yaml::to_string(&c).unwrap();
        assert!(out.contains("localOS: linux"));
        assert!(!out.contains("onCreate"));
        assert!(!out.contains("scripts"));
    }
}
