//! Findings reporter
//!
//! One table per originating package, each followed by its warning and
//! error counts.

use console::{Alignment, StyledObject, pad_str, style};
use std::io::{self, Write};
use std::path::Path;

use zarf_compose::HEAD_LOCATION;
use zarf_core::is_oci_url;
use zarf_lint::{Finding, Severity, count_by_severity, group_findings_by_path};

const HEADER: [&str; 3] = ["Type", "Path", "Message"];

pub struct FindingsReporter {
    writer: Box<dyn Write>,
}

impl Default for FindingsReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FindingsReporter {
    /// A reporter writing to stdout
    pub fn new() -> Self {
        Self {
            writer: Box::new(io::stdout()),
        }
    }

    /// Create a reporter that writes to a custom writer (for testing)
    #[cfg(test)]
    pub fn with_writer<W: Write + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Print findings at or above `threshold`, grouped by package
    pub fn render(
        &mut self,
        findings: &[Finding],
        threshold: Severity,
        base_dir: &Path,
        package_name: &str,
    ) -> io::Result<()> {
        let grouped = group_findings_by_path(findings, threshold, package_name);
        if grouped.is_empty() {
            writeln!(
                self.writer,
                "{} 0 findings for {:?}",
                style("✓").green(),
                package_name
            )?;
            return Ok(());
        }

        for (path, group) in &grouped {
            let name = &group[0].package_name_override;
            let shown = if is_oci_url(path) {
                path.clone()
            } else if path == HEAD_LOCATION {
                base_dir.display().to_string()
            } else {
                base_dir.join(path).display().to_string()
            };

            writeln!(self.writer)?;
            writeln!(
                self.writer,
                "{} Linting package {:?} at {}",
                style("→").blue(),
                name,
                style(shown).bold()
            )?;
            self.table(group)?;

            let (errors, warnings) = count_by_severity(group);
            writeln!(
                self.writer,
                "{} warning(s) and {} error(s) in {:?}",
                warnings, errors, name
            )?;
        }
        Ok(())
    }

    fn table(&mut self, group: &[Finding]) -> io::Result<()> {
        let rows: Vec<[StyledObject<String>; 3]> = group
            .iter()
            .map(|f| {
                [
                    severity_style(f.severity),
                    style(f.yq_path.clone()).cyan(),
                    style(f.to_string()),
                ]
            })
            .collect();

        let mut widths = HEADER.map(str::len);
        for finding in group {
            widths[0] = widths[0].max(finding.severity.to_string().len());
            widths[1] = widths[1].max(finding.yq_path.len());
        }

        writeln!(
            self.writer,
            "  {}  {}  {}",
            pad_str(HEADER[0], widths[0], Alignment::Left, None),
            pad_str(HEADER[1], widths[1], Alignment::Left, None),
            HEADER[2]
        )?;
        for [severity, path, message] in rows {
            writeln!(
                self.writer,
                "  {}  {}  {}",
                pad_str(&severity.to_string(), widths[0], Alignment::Left, None),
                pad_str(&path.to_string(), widths[1], Alignment::Left, None),
                message
            )?;
        }
        Ok(())
    }
}

fn severity_style(severity: Severity) -> StyledObject<String> {
    match severity {
        Severity::Error => style(severity.to_string()).red(),
        Severity::Warning => style(severity.to_string()).yellow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A thread-safe buffer for testing
    #[derive(Clone, Default)]
    struct TestBuffer {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl TestBuffer {
        fn contents(&self) -> String {
            let guard = self.inner.lock().unwrap();
            String::from_utf8(guard.clone()).unwrap()
        }
    }

    impl Write for TestBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn render(findings: &[Finding], threshold: Severity) -> String {
        console::set_colors_enabled(false);
        let buffer = TestBuffer::default();
        let mut reporter = FindingsReporter::with_writer(buffer.clone());
        reporter
            .render(findings, threshold, Path::new("pkg"), "demo")
            .unwrap();
        buffer.contents()
    }

    #[test]
    fn test_no_findings() {
        let out = render(&[], Severity::Warning);
        assert!(out.contains("0 findings for \"demo\""));
    }

    #[test]
    fn test_groups_by_package() {
        let findings = vec![
            Finding::warning("Unpinned repository")
                .at(".components.[0].repos.[0]")
                .with_item("https://github.com/org/repo"),
            Finding::error("Failed to parse image reference")
                .at(".components.[1].images.[0]")
                .with_item("busybox:bad/image")
                .from_package("lib", "common"),
            Finding::warning("Image not pinned with digest")
                .at(".components.[0].images.[0]")
                .with_item("nginx:1.25")
                .from_package("remote", "oci://ghcr.io/org/lib:1.0.0"),
        ];
        let out = render(&findings, Severity::Warning);

        assert!(out.contains("Linting package \"demo\" at pkg\n"));
        assert!(!out.contains("pkg/."));
        assert!(out.contains("Linting package \"lib\" at pkg/common"));
        assert!(out.contains("Linting package \"remote\" at oci://ghcr.io/org/lib:1.0.0"));
        assert!(out.contains("Unpinned repository - https://github.com/org/repo"));
        assert!(out.contains("1 warning(s) and 0 error(s) in \"demo\""));
        assert!(out.contains("0 warning(s) and 1 error(s) in \"lib\""));
        assert!(out.contains("  Type     Path"));
    }

    #[test]
    fn test_threshold_hides_warnings() {
        let findings = vec![Finding::warning("Unpinned repository").with_item("r")];
        let out = render(&findings, Severity::Error);
        assert!(out.contains("0 findings"));
    }
}
