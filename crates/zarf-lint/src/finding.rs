//! Lint findings and their severities

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use zarf_compose::HEAD_LOCATION;

/// How serious a finding is
///
/// Ordered from most to least severe, so `severity <= threshold` selects
/// everything at or above the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// One lint result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// yq-style locator into the definition, e.g. `.components.[1].images.[0]`
    pub yq_path: String,

    pub description: String,

    /// The offending value, if any
    pub item: String,

    /// Package the finding originates from; empty means the linted package
    pub package_name_override: String,

    /// Location of that package relative to the linted one; empty means `.`
    pub package_path_override: String,

    pub severity: Severity,
}

impl Finding {
    pub fn new(severity: Severity, description: impl Into<String>) -> Self {
        Self {
            yq_path: String::new(),
            description: description.into(),
            item: String::new(),
            package_name_override: String::new(),
            package_path_override: String::new(),
            severity,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(Severity::Error, description)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::new(Severity::Warning, description)
    }

    pub fn at(mut self, yq_path: impl Into<String>) -> Self {
        self.yq_path = yq_path.into();
        self
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = item.into();
        self
    }

    /// Attribute the finding to an imported package
    pub fn from_package(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.package_name_override = name.into();
        self.package_path_override = path.into();
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.item.is_empty() {
            write!(f, "{}", self.description)
        } else {
            write!(f, "{} - {}", self.description, self.item)
        }
    }
}

pub fn has_severity(findings: &[Finding], severity: Severity) -> bool {
    findings.iter().any(|f| f.severity == severity)
}

/// Whether any finding must fail the build
pub fn has_errors(findings: &[Finding]) -> bool {
    has_severity(findings, Severity::Error)
}

/// Group findings by the package they originate from
///
/// Findings less severe than `threshold` are dropped. Findings without
/// provenance are attributed to `package_name` at `.`.
pub fn group_findings_by_path(
    findings: &[Finding],
    threshold: Severity,
    package_name: &str,
) -> BTreeMap<String, Vec<Finding>> {
    let mut grouped: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
    for finding in findings.iter().filter(|f| f.severity <= threshold) {
        let mut finding = finding.clone();
        if finding.package_name_override.is_empty() {
            finding.package_name_override = package_name.to_string();
        }
        if finding.package_path_override.is_empty() {
            finding.package_path_override = HEAD_LOCATION.to_string();
        }
        grouped
            .entry(finding.package_path_override.clone())
            .or_default()
            .push(finding);
    }
    grouped
}
