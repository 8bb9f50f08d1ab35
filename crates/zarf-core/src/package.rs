//! Package definition and loading

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::component::Component;
use crate::error::{CoreError, Result};
use crate::variables::{Constant, InteractiveVariable};

/// File name of a package definition inside its directory
pub const PACKAGE_FILE: &str = "zarf.yaml";

/// A package definition (`zarf.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Package type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PackageKind>,

    /// Package metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Provenance written by the build process
    #[serde(default, skip_serializing_if = "BuildData::is_empty")]
    pub build: BuildData,

    /// Components, in declaration order
    #[serde(default)]
    pub components: Vec<Component>,

    /// Constants available to templates at deploy time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<Constant>,

    /// Variables prompted for or set at deploy time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<InteractiveVariable>,
}

/// Package type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageKind {
    /// Bootstraps a cluster
    ZarfInitConfig,
    /// Everything else
    #[default]
    ZarfPackageConfig,
}

/// Package metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Package name (required)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub uncompressed: bool,

    /// Target architecture; falls back to the builder's when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,

    /// Deploy without the air-gap machinery (no registry, no git server)
    #[serde(default, skip_serializing_if = "is_false")]
    pub yolo: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub authors: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vendor: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aggregate_checksum: String,
}

/// Build provenance, never authored by hand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub terminal: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Migrations already applied to this package's components
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub migrations: Vec<String>,

    #[serde(default, skip_serializing_if = "indexmap::IndexMap::is_empty")]
    pub registry_overrides: indexmap::IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub differential: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub differential_missing: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_non_breaking_version: String,

    /// Flavor the package was built with
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flavor: String,
}

impl BuildData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether a named migration was already applied when this package was built
    pub fn has_migration(&self, migration: &str) -> bool {
        self.migrations.iter().any(|m| m == migration)
    }
}

impl Package {
    /// Load a package definition from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::PackageNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `zarf.yaml` from a package directory
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::from_file(dir.as_ref().join(PACKAGE_FILE))
    }

    /// Parse a package definition from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Render back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Generic structural form used for schema validation
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn is_init_config(&self) -> bool {
        self.kind == Some(PackageKind::ZarfInitConfig)
    }
}

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_deserialize() {
        let yaml = r#"
kind: ZarfPackageConfig
metadata:
  name: podinfo
  architecture: amd64
components:
  - name: podinfo
    required: true
    images:
      - ghcr.io/stefanprodan/podinfo:6.4.0
variables:
  - name: DOMAIN
    default: example.com
"#;
        let pkg = Package::from_yaml(yaml).unwrap();
        assert_eq!(pkg.kind, Some(PackageKind::ZarfPackageConfig));
        assert_eq!(pkg.metadata.name, "podinfo");
        assert_eq!(pkg.metadata.architecture, "amd64");
        assert_eq!(pkg.components.len(), 1);
        assert!(pkg.components[0].is_required());
        assert_eq!(pkg.variables[0].variable.name, "DOMAIN");
        assert!(!pkg.is_init_config());
    }

    #[test]
    fn test_missing_kind_is_not_defaulted() {
        let pkg = Package::from_yaml("metadata:\n  name: x\n").unwrap();
        assert!(pkg.kind.is_none());

        let value = pkg.to_json_value().unwrap();
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_empty_fields_are_not_serialized() {
        let pkg = Package::from_yaml("kind: ZarfInitConfig\nmetadata:\n  name: init\n").unwrap();
        let yaml = pkg.to_yaml().unwrap();

        assert!(yaml.contains("kind: ZarfInitConfig"));
        assert!(!yaml.contains("build"));
        assert!(!yaml.contains("yolo"));
        assert!(pkg.is_init_config());
    }

    #[test]
    fn test_build_migrations() {
        let build = BuildData {
            migrations: vec!["scripts-to-actions".to_string()],
            ..Default::default()
        };
        assert!(build.has_migration("scripts-to-actions"));
        assert!(!build.has_migration("pluralize-set-variable"));
        assert!(!build.is_empty());
        assert!(BuildData::default().is_empty());
    }

    #[test]
    fn test_from_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = Package::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::PackageNotFound { .. }));
    }
}
