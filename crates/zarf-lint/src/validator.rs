//! Finding accumulator

use crate::finding::{Finding, Severity, has_errors};

/// Collects findings in order, ignoring exact duplicates
#[derive(Debug, Default, Clone)]
pub struct Validator {
    findings: Vec<Finding>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding unless an identical one is already present
    pub fn add(&mut self, finding: Finding) {
        if !self.findings.contains(&finding) {
            self.findings.push(finding);
        }
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        for finding in findings {
            self.add(finding);
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.findings)
    }

    /// `(errors, warnings)`
    pub fn counts(&self) -> (usize, usize) {
        count_by_severity(&self.findings)
    }
}

/// `(errors, warnings)` in a slice of findings
pub fn count_by_severity(findings: &[Finding]) -> (usize, usize) {
    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    (errors, findings.len() - errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_dropped() {
        let mut v = Validator::new();
        v.add(Finding::warning("Unpinned repository").with_item("a"));
        v.add(Finding::warning("Unpinned repository").with_item("a"));
        v.add(Finding::warning("Unpinned repository").with_item("b"));
        assert_eq!(v.findings().len(), 2);
    }

    #[test]
    fn test_error_gating() {
        let mut v = Validator::new();
        assert!(v.is_empty());
        assert!(!v.has_errors());

        v.add(Finding::warning("just a warning"));
        assert!(!v.has_errors());

        v.add(Finding::error("broken"));
        assert!(v.has_errors());
        assert_eq!(v.counts(), (1, 1));
    }
}
