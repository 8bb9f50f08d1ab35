//! Where imported package definitions come from
//!
//! The chain builder never touches the filesystem or a registry itself. It
//! asks a [`PackageSource`] for the definition behind an import reference.

use once_cell::unsync::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use zarf_core::{PACKAGE_FILE, Package};

use crate::error::{ComposeError, Result};
use crate::oci::OciSource;
use crate::paths::display_path;

/// Default bound on a single OCI fetch
pub const DEFAULT_OCI_TIMEOUT: Duration = Duration::from_secs(60);

/// Location of a package definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Directory relative to the head package's base directory
    Local(PathBuf),
    /// `oci://` reference to a published skeleton package
    Oci(String),
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Local(dir) => write!(f, "{}", display_path(dir)),
            SourceRef::Oci(url) => write!(f, "{}", url),
        }
    }
}

/// Fetches package definitions
pub trait PackageSource {
    fn fetch(&self, reference: &SourceRef) -> Result<Package>;
}

/// Reads `zarf.yaml` from directories below a base directory
#[derive(Debug, Clone)]
pub struct LocalSource {
    pub base_dir: PathBuf,
}

impl LocalSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Path of the definition file for a head-relative directory
    pub fn definition_path(&self, dir: &Path) -> PathBuf {
        self.base_dir.join(dir).join(PACKAGE_FILE)
    }
}

impl PackageSource for LocalSource {
    fn fetch(&self, reference: &SourceRef) -> Result<Package> {
        let dir = match reference {
            SourceRef::Local(dir) => dir,
            SourceRef::Oci(url) => {
                return Err(ComposeError::UnsupportedSource {
                    source_kind: "local",
                    reference: url.clone(),
                });
            }
        };

        let path = self.definition_path(dir);
        let shown = display_path(&path);
        tracing::debug!(path = %shown, "reading imported package definition");

        let content = std::fs::read_to_string(&path).map_err(|source| {
            ComposeError::ReadDefinition {
                path: shown.clone(),
                source,
            }
        })?;
        Package::from_yaml(&content).map_err(|source| ComposeError::ParseDefinition {
            path: shown,
            source,
        })
    }
}

/// Local directories through [`LocalSource`], registries through a lazily created [`OciSource`]
pub struct DefaultSource {
    local: LocalSource,
    oci_timeout: Duration,
    oci: OnceCell<OciSource>,
}

impl DefaultSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            local: LocalSource::new(base_dir),
            oci_timeout: DEFAULT_OCI_TIMEOUT,
            oci: OnceCell::new(),
        }
    }

    pub fn with_oci_timeout(mut self, timeout: Duration) -> Self {
        self.oci_timeout = timeout;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.local.base_dir
    }
}

impl PackageSource for DefaultSource {
    fn fetch(&self, reference: &SourceRef) -> Result<Package> {
        match reference {
            SourceRef::Local(_) => self.local.fetch(reference),
            SourceRef::Oci(_) => {
                let oci = self
                    .oci
                    .get_or_try_init(|| OciSource::new(self.oci_timeout))?;
                oci.fetch(reference)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_source_reads_definition() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("common")).unwrap();
        std::fs::write(
            dir.path().join("common").join(PACKAGE_FILE),
            "kind: ZarfPackageConfig\nmetadata:\n  name: common\ncomponents:\n  - name: web\n",
        )
        .unwrap();

        let source = LocalSource::new(dir.path());
        let pkg = source.fetch(&SourceRef::Local(PathBuf::from("common"))).unwrap();
        assert_eq!(pkg.metadata.name, "common");
        assert_eq!(pkg.components[0].name, "web");
    }

    #[test]
    fn test_local_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalSource::new(dir.path());
        let err = source
            .fetch(&SourceRef::Local(PathBuf::from("fake-path")))
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, ComposeError::ReadDefinition { .. }));
        assert!(message.contains("fake-path/zarf.yaml"), "{message}");
    }

    #[test]
    fn test_local_source_rejects_oci() {
        let source = LocalSource::new(".");
        let err = source
            .fetch(&SourceRef::Oci("oci://ghcr.io/org/pkg:1.0.0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnsupportedSource { .. }));
    }

    #[test]
    fn test_source_ref_display() {
        assert_eq!(SourceRef::Local(PathBuf::from("a/b")).to_string(), "a/b");
        assert_eq!(SourceRef::Oci("oci://x/y:1".to_string()).to_string(), "oci://x/y:1");
    }
}
