//! Lexical path helpers shared by the chain builder and the composer

use std::path::{Component as PathComponent, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments and fold `dir/..` pairs
///
/// Leading `..` segments are kept. An empty result is `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<PathComponent<'_>> = Vec::new();
    for part in path.components() {
        match part {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => match out.last() {
                Some(PathComponent::Normal(_)) => {
                    out.pop();
                }
                Some(PathComponent::RootDir) | Some(PathComponent::Prefix(_)) => {}
                _ => out.push(part),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Whether a string is a URL with a host (`https://...`, `oci://...`)
pub fn is_url(s: &str) -> bool {
    url::Url::parse(s).map(|u| u.has_host()).unwrap_or(false)
}

/// Rebase a path from an imported package onto the head package's directory
///
/// URLs and absolute paths are returned unchanged.
pub fn make_path_relative_to(path: &str, relative_to: &str) -> String {
    if is_url(path) || Path::new(path).is_absolute() {
        return path.to_string();
    }
    clean_path(&Path::new(relative_to).join(path))
        .to_string_lossy()
        .into_owned()
}

/// Path as a forward-slash string for messages and provenance
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
