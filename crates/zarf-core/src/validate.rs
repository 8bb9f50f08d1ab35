//! Structural validation of package definitions
//!
//! These rules complement the JSON schema: they cover relationships the
//! schema cannot express, such as unique names and group consistency. Every
//! rule runs and all violations are reported together.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::component::{Action, Chart, Manifest};
use crate::error::ValidationErrors;
use crate::package::Package;

/// Longest chart or manifest name accepted
pub const MAX_CHART_NAME_LENGTH: usize = 40;

/// Operating systems a component may be restricted to; empty means any
pub const SUPPORTED_OS: [&str; 4] = ["linux", "darwin", "windows", ""];

/// Package and component names
pub static LOWERCASE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*$").expect("valid name regex"));

impl Package {
    /// Run every structural rule and collect all violations
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        if self.is_init_config() && self.metadata.yolo {
            errs.push("sorry, you can't YOLO an init package");
        }

        if !LOWERCASE_NAME.is_match(&self.metadata.name) {
            errs.push(format!(
                "package name {:?} must be all lowercase and contain no special characters except '-' and cannot start with a '-'",
                self.metadata.name
            ));
        }

        if self.components.is_empty() {
            errs.push("package must have at least 1 component");
        }

        for variable in &self.variables {
            if let Err(e) = variable.validate() {
                errs.push(format!("invalid package variable: {}", e));
            }
        }

        for constant in &self.constants {
            if let Err(e) = constant.validate() {
                errs.push(format!("invalid package constant: {}", e));
            }
        }

        if self.metadata.yolo {
            for component in &self.components {
                if !component.images.is_empty() {
                    errs.push("OCI images not allowed in YOLO");
                }
                if !component.repos.is_empty() {
                    errs.push("git repos not allowed in YOLO");
                }
                if !component.only.cluster.architecture.is_empty() {
                    errs.push("cluster architecture not allowed in YOLO");
                }
                if !component.only.cluster.distros.is_empty() {
                    errs.push("cluster distros not allowed in YOLO");
                }
            }
        }

        let mut component_names = HashSet::new();
        let mut group_default: IndexMap<&str, &str> = IndexMap::new();
        let mut grouped: IndexMap<&str, Vec<&str>> = IndexMap::new();

        for component in &self.components {
            if !component_names.insert(component.name.as_str()) {
                errs.push(format!("component name {:?} is not unique", component.name));
            }

            if !LOWERCASE_NAME.is_match(&component.name) {
                errs.push(format!(
                    "component name {:?} must be all lowercase and contain no special characters except '-' and cannot start with a '-'",
                    component.name
                ));
            }

            if !SUPPORTED_OS.contains(&component.only.local_os.as_str()) {
                errs.push(format!(
                    "component {:?} contains a localOS value that is not supported: {} (supported: {:?})",
                    component.name, component.only.local_os, SUPPORTED_OS
                ));
            }

            if component.is_required() {
                if component.default {
                    errs.push(format!(
                        "component {:?} cannot be both required and default",
                        component.name
                    ));
                }
                if !component.group.is_empty() {
                    errs.push(format!(
                        "component {:?} cannot be both required and grouped",
                        component.name
                    ));
                }
            }

            let mut chart_names = HashSet::new();
            for chart in &component.charts {
                if !chart_names.insert(chart.name.as_str()) {
                    errs.push(format!("chart name {:?} is not unique", chart.name));
                }
                if let Err(e) = chart.validate() {
                    errs.push(format!("invalid chart definition: {}", e));
                }
            }

            let mut manifest_names = HashSet::new();
            for manifest in &component.manifests {
                if !manifest_names.insert(manifest.name.as_str()) {
                    errs.push(format!("manifest name {:?} is not unique", manifest.name));
                }
                if let Err(e) = manifest.validate() {
                    errs.push(format!("invalid manifest definition: {}", e));
                }
            }

            for set in component.actions.sets() {
                for action in set.lists().into_iter().flatten() {
                    if let Err(e) = action.validate() {
                        errs.push(format!("invalid action: {}", e));
                    }
                }
            }

            if !component.group.is_empty() {
                let group = component.group.as_str();
                if component.default {
                    if let Some(previous) = group_default.get(group) {
                        errs.push(format!(
                            "group {:?} has multiple defaults ({:?}, {:?})",
                            group, previous, component.name
                        ));
                    }
                    group_default.insert(group, &component.name);
                }
                grouped.entry(group).or_default().push(&component.name);
            }
        }

        for (group, members) in &grouped {
            if let [only] = members.as_slice() {
                errs.push(format!(
                    "group {:?} only has one component ({:?})",
                    group, only
                ));
            }
        }

        errs.into_result()
    }
}

impl Chart {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        if self.name.is_empty() {
            errs.push("chart must include a name");
        }
        if self.name.len() > MAX_CHART_NAME_LENGTH {
            errs.push(format!(
                "chart {:?} exceed the maximum length of {} characters",
                self.name, MAX_CHART_NAME_LENGTH
            ));
        }
        if self.namespace.is_empty() {
            errs.push(format!("chart {:?} must include a namespace", self.name));
        }
        // exactly one source
        if self.url.is_empty() == self.local_path.is_empty() {
            errs.push(format!(
                "chart {:?} must have either a url or localPath",
                self.name
            ));
        }
        if self.version.is_empty() {
            errs.push(format!("chart {:?} must include a chart version", self.name));
        }
        errs.into_result()
    }
}

impl Manifest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        if self.name.is_empty() {
            errs.push("manifest must include a name");
        }
        if self.name.len() > MAX_CHART_NAME_LENGTH {
            errs.push(format!(
                "manifest {:?} exceed the maximum length of {} characters",
                self.name, MAX_CHART_NAME_LENGTH
            ));
        }
        if self.files.is_empty() && self.kustomizations.is_empty() {
            errs.push(format!(
                "manifest {:?} must have at least one file or kustomization",
                self.name
            ));
        }
        errs.into_result()
    }
}

impl Action {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        for variable in &self.set_variables {
            if let Err(e) = variable.validate() {
                errs.extend(e);
            }
        }

        if let Some(wait) = &self.wait {
            if !self.cmd.is_empty() {
                errs.push(format!(
                    "action {:?} cannot be both a command and wait action",
                    self.cmd
                ));
            }
            if wait.cluster.is_some() == wait.network.is_some() {
                errs.push("a single wait action must contain only one of cluster or network");
            }
        }
        errs.into_result()
    }
}
