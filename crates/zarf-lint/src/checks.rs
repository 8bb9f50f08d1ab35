//! Semantic checks over a single component

use oci_distribution::{ParseError, Reference};

use zarf_compose::contains_placeholder;
use zarf_compose::paths::is_url;
use zarf_core::Component;

use crate::finding::Finding;

/// Flag template placeholders in `import.path` / `import.url`
///
/// Imports are resolved before templates are filled, so such placeholders
/// can never take effect.
pub fn check_for_var_in_component_import(component: &Component, index: usize) -> Vec<Finding> {
    let mut findings = Vec::new();
    let import = &component.import;

    if contains_placeholder(&import.path) {
        findings.push(
            Finding::warning("Zarf does not evaluate variables at component.x.import.path")
                .at(format!(".components.[{}].import.path", index))
                .with_item(&import.path),
        );
    }
    if contains_placeholder(&import.url) {
        findings.push(
            Finding::warning("Zarf does not evaluate variables at component.x.import.url")
                .at(format!(".components.[{}].import.url", index))
                .with_item(&import.url),
        );
    }
    findings
}

/// Pinning checks in order: repos, images, files
pub fn check_component(component: &Component, index: usize) -> Vec<Finding> {
    let mut findings = check_for_unpinned_repos(component, index);
    findings.extend(check_for_unpinned_images(component, index));
    findings.extend(check_for_unpinned_files(component, index));
    findings
}

pub fn check_for_unpinned_repos(component: &Component, index: usize) -> Vec<Finding> {
    component
        .repos
        .iter()
        .enumerate()
        .filter(|(_, repo)| !is_pinned_repo(repo))
        .map(|(j, repo)| {
            Finding::warning("Unpinned repository")
                .at(format!(".components.[{}].repos.[{}]", index, j))
                .with_item(repo)
        })
        .collect()
}

pub fn check_for_unpinned_images(component: &Component, index: usize) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (j, image) in component.images.iter().enumerate() {
        let path = format!(".components.[{}].images.[{}]", index, j);
        match is_pinned_image(image) {
            Ok(true) => {}
            Ok(false) => findings.push(
                Finding::warning("Image not pinned with digest")
                    .at(path)
                    .with_item(image),
            ),
            Err(e) => {
                tracing::debug!(%image, error = %e, "unparseable image reference");
                findings.push(
                    Finding::error("Failed to parse image reference")
                        .at(path)
                        .with_item(image),
                );
            }
        }
    }
    findings
}

pub fn check_for_unpinned_files(component: &Component, index: usize) -> Vec<Finding> {
    component
        .files
        .iter()
        .enumerate()
        .filter(|(_, file)| file.shasum.is_empty() && is_url(&file.source))
        .map(|(j, file)| {
            Finding::warning("No shasum for remote file")
                .at(format!(".components.[{}].files.[{}]", index, j))
                .with_item(&file.source)
        })
        .collect()
}

/// A repo is pinned when it names a ref after `@`
pub fn is_pinned_repo(repo: &str) -> bool {
    repo.contains('@')
}

/// Whether an image reference carries a digest
///
/// References that fail to parse only because they are templated are
/// assumed to resolve to something valid. Cosign signature and attestation
/// tags are content addressed and count as pinned.
pub fn is_pinned_image(image: &str) -> Result<bool, ParseError> {
    let reference = match Reference::try_from(image) {
        Ok(reference) => reference,
        Err(_) if contains_placeholder(image) => return Ok(true),
        Err(e) => return Err(e),
    };

    if reference
        .tag()
        .is_some_and(|tag| tag.ends_with(".sig") || tag.ends_with(".att"))
    {
        return Ok(true);
    }
    Ok(reference.digest().is_some())
}
