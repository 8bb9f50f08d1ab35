//! Component selection by architecture and flavor

use zarf_core::Component;

/// Whether a component applies to the target architecture and flavor
///
/// Empty `only` constraints match everything. Composition and linting must
/// both go through this so lint results describe what actually gets built.
pub fn is_compatible(component: &Component, architecture: &str, flavor: &str) -> bool {
    let only = &component.only;
    let arch_ok = only.cluster.architecture.is_empty() || only.cluster.architecture == architecture;
    let flavor_ok = only.flavor.is_empty() || only.flavor == flavor;
    arch_ok && flavor_ok
}

/// Drop the filters that selected a component so they don't leak into the result
pub fn strip_filters(component: &mut Component) {
    component.only.cluster.architecture.clear();
    component.only.flavor.clear();
}

/// Target architecture: explicit override, then the package's, then the host's
pub fn resolve_architecture(override_arch: Option<&str>, package_arch: &str) -> String {
    match override_arch {
        Some(arch) if !arch.is_empty() => arch.to_string(),
        _ if !package_arch.is_empty() => package_arch.to_string(),
        _ => host_architecture().to_string(),
    }
}

/// Host architecture in the naming used by container registries
pub fn host_architecture() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zarf_core::{ComponentOnly, OnlyCluster};

    fn only(arch: &str, flavor: &str) -> Component {
        Component {
            name: "c".to_string(),
            only: ComponentOnly {
                cluster: OnlyCluster {
                    architecture: arch.to_string(),
                    ..Default::default()
                },
                flavor: flavor.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_is_compatible() {
        let cases = [
            ("", "", "amd64", "", true),
            ("", "", "arm64", "vanilla", true),
            ("amd64", "", "amd64", "", true),
            ("amd64", "", "arm64", "", false),
            ("", "vanilla", "amd64", "vanilla", true),
            ("", "vanilla", "amd64", "chocolate", false),
            ("", "vanilla", "amd64", "", false),
            ("arm64", "vanilla", "arm64", "vanilla", true),
            ("arm64", "vanilla", "amd64", "vanilla", false),
            ("arm64", "vanilla", "arm64", "chocolate", false),
        ];
        for (arch, flavor, target_arch, target_flavor, expected) in cases {
            assert_eq!(
                is_compatible(&only(arch, flavor), target_arch, target_flavor),
                expected,
                "only({arch:?}, {flavor:?}) against ({target_arch:?}, {target_flavor:?})"
            );
        }
    }

    #[test]
    fn test_strip_filters() {
        let mut c = only("amd64", "vanilla");
        c.only.local_os = "linux".to_string();
        strip_filters(&mut c);
        assert!(c.only.cluster.architecture.is_empty());
        assert!(c.only.flavor.is_empty());
        assert_eq!(c.only.local_os, "linux");
    }

    #[test]
    fn test_resolve_architecture() {
        assert_eq!(resolve_architecture(Some("arm64"), "amd64"), "arm64");
        assert_eq!(resolve_architecture(Some(""), "amd64"), "amd64");
        assert_eq!(resolve_architecture(None, "amd64"), "amd64");
        assert_eq!(resolve_architecture(None, ""), host_architecture());
    }
}
