//! CLI configuration
//!
//! Read from `--config <path>` (or `ZARF_CONFIG`), else `zarf-config.yaml` in
//! the working directory, else `~/.config/zarf/zarf-config.yaml`. Every
//! setting can be overridden by a flag.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use zarf_compose::DEFAULT_OCI_TIMEOUT;

use crate::error::{CliError, Result};

/// Config file name looked up in the working and user config directories
pub const CONFIG_FILE: &str = "zarf-config.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default target architecture
    pub architecture: String,

    pub package: PackageConfig,

    pub oci: OciConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub create: CreateConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateConfig {
    /// Package template values
    pub set: IndexMap<String, String>,

    pub flavor: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OciConfig {
    /// Bound on a single registry fetch
    pub timeout_seconds: Option<u64>,
}

impl Config {
    /// Load from the working directory or the user config directory
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))?;
        let mut config: Self = serde_yaml::from_str(&content)
            .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))?;

        // template keys are upper case
        config.package.create.set = config
            .package
            .create
            .set
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        Ok(config)
    }

    /// `~/.config/zarf/zarf-config.yaml`, when a config directory exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zarf").join(CONFIG_FILE))
    }

    pub fn oci_timeout(&self) -> Duration {
        self.oci
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_OCI_TIMEOUT)
    }

    /// Config values overlaid with `--set KEY=value` flags
    pub fn set_variables(&self, flags: &[String]) -> Result<IndexMap<String, String>> {
        let mut vars = self.package.create.set.clone();
        vars.extend(parse_set_flags(flags)?);
        Ok(vars)
    }

    /// The flag's flavor, else the configured one
    pub fn flavor(&self, flag: Option<String>) -> String {
        flag.unwrap_or_else(|| self.package.create.flavor.clone())
    }

    /// The flag's architecture, else the configured one
    pub fn architecture(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| (!self.architecture.is_empty()).then(|| self.architecture.clone()))
    }
}

/// Parse `KEY=value` pairs; keys are upper-cased
pub fn parse_set_flags(flags: &[String]) -> Result<IndexMap<String, String>> {
    flags
        .iter()
        .map(|flag| {
            flag.split_once('=')
                .map(|(k, v)| (k.trim().to_uppercase(), v.to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| {
                    CliError::usage(
                        format!("invalid --set value {:?}", flag),
                        "Use --set KEY=value",
                    )
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_flags() {
        let vars = parse_set_flags(&["tag=1.0".to_string(), "URL=a=b".to_string()]).unwrap();
        assert_eq!(vars["TAG"], "1.0");
        assert_eq!(vars["URL"], "a=b");

        assert!(parse_set_flags(&["novalue".to_string()]).is_err());
        assert!(parse_set_flags(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "architecture: arm64\npackage:\n  create:\n    flavor: upstream\n    set:\n      tag: \"1.2\"\noci:\n  timeout_seconds: 5\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.architecture(None).as_deref(), Some("arm64"));
        assert_eq!(config.flavor(None), "upstream");
        assert_eq!(config.flavor(Some("vanilla".to_string())), "vanilla");
        assert_eq!(config.oci_timeout(), Duration::from_secs(5));

        let vars = config.set_variables(&["TAG=2.0".to_string(), "other=x".to_string()]).unwrap();
        assert_eq!(vars["TAG"], "2.0");
        assert_eq!(vars["OTHER"], "x");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.oci_timeout(), DEFAULT_OCI_TIMEOUT);
        assert_eq!(config.architecture(None), None);
    }

    #[test]
    fn test_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "package: [not, a, map]\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(CliError::Config { .. })));
    }
}
