//! Import chain resolution
//!
//! A component that imports another package's component is resolved into an
//! ordered chain of nodes. The head is the component as written in the
//! top-level package, each following node is the component it imports, and
//! the tail is the first component with no further import.
//!
//! The chain is an ordered `Vec` of nodes; "previous" and "next" are index
//! neighbours.

use std::fmt;
use std::path::PathBuf;

use zarf_core::{Component, Constant, InteractiveVariable, Package};

use crate::error::{ComposeError, Result};
use crate::filter::{is_compatible, strip_filters};
use crate::paths::{clean_path, display_path};
use crate::source::{PackageSource, SourceRef};

/// Head-relative location of the top-level package
pub const HEAD_LOCATION: &str = ".";

/// One component in an import chain
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The component as defined in its own package
    pub component: Component,

    /// Index of the component within its own package
    index: usize,

    /// Name of the package the component was found in
    original_package_name: String,

    /// Directory of the defining package relative to the head package
    relative_to_head: String,

    /// `oci://` reference this node's package was fetched from, if remote
    remote: Option<String>,

    /// Package-level declarations of the defining package
    vars: Vec<InteractiveVariable>,
    consts: Vec<Constant>,
}

impl Node {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn original_package_name(&self) -> &str {
        &self.original_package_name
    }

    pub fn relative_to_head(&self) -> &str {
        &self.relative_to_head
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Where findings about this node should point the user
    ///
    /// The registry reference for components pulled from OCI, otherwise the
    /// package directory relative to the head.
    pub fn import_location(&self) -> String {
        match &self.remote {
            Some(url) => url.clone(),
            None => self.relative_to_head.clone(),
        }
    }

    pub fn variables(&self) -> &[InteractiveVariable] {
        &self.vars
    }

    pub fn constants(&self) -> &[Constant] {
        &self.consts
    }
}

/// Ordered chain from the head component to the last import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportChain {
    nodes: Vec<Node>,
}

impl ImportChain {
    /// Resolve the import chain of `head`, the component at `index` in `package`
    ///
    /// Any failure aborts the chain. Use [`ImportChain::build_partial`] to
    /// keep the nodes resolved before the failure.
    pub fn build(
        head: Component,
        index: usize,
        package: &Package,
        architecture: &str,
        flavor: &str,
        source: &dyn PackageSource,
    ) -> Result<Self> {
        match Self::build_partial(head, index, package, architecture, flavor, source) {
            (chain, None) => Ok(chain),
            (_, Some(err)) => Err(err),
        }
    }

    /// Resolve as much of the chain as possible
    ///
    /// Returns the nodes resolved so far together with the error that stopped
    /// resolution, if any. The head node is always present.
    pub fn build_partial(
        head: Component,
        index: usize,
        package: &Package,
        architecture: &str,
        flavor: &str,
        source: &dyn PackageSource,
    ) -> (Self, Option<ComposeError>) {
        let mut chain = ImportChain {
            nodes: vec![Node {
                component: head,
                index,
                original_package_name: package.metadata.name.clone(),
                relative_to_head: HEAD_LOCATION.to_string(),
                remote: None,
                vars: package.variables.clone(),
                consts: package.constants.clone(),
            }],
        };

        if architecture.is_empty() {
            return (chain, Some(ComposeError::MissingArchitecture));
        }

        let err = chain.resolve(architecture, flavor, source).err();
        tracing::debug!(chain = %chain, "built import chain");
        (chain, err)
    }

    fn resolve(&mut self, architecture: &str, flavor: &str, source: &dyn PackageSource) -> Result<()> {
        let mut history = PathBuf::new();

        loop {
            let tail = self.tail();
            if !tail.component.has_import() {
                return Ok(());
            }
            tail.component
                .validate_import()
                .map_err(ComposeError::InvalidImport)?;

            let import = tail.component.import.clone();
            let name = tail.component.import_name().to_string();
            let parent_remote = tail.remote.clone();

            let (reference, relative_to_head, remote) = if !import.path.is_empty() {
                if parent_remote.is_some() {
                    return Err(ComposeError::LocalFromRemote);
                }
                history.push(&import.path);
                let relative = display_path(&clean_path(&history));
                self.check_cycle(&relative, false)?;
                (
                    SourceRef::Local(PathBuf::from(&relative)),
                    relative,
                    None,
                )
            } else {
                self.check_cycle(&import.url, true)?;
                (
                    SourceRef::Oci(import.url.clone()),
                    self.tail().relative_to_head.clone(),
                    Some(import.url.clone()),
                )
            };

            let location = reference.to_string();
            let package = source.fetch(&reference)?;

            let mut matches = package
                .components
                .iter()
                .enumerate()
                .filter(|(_, c)| c.name == name && is_compatible(c, architecture, flavor));

            let (found_index, found) = match (matches.next(), matches.next()) {
                (Some(found), None) => found,
                (None, _) => {
                    return Err(ComposeError::ComponentNotFound { name, location });
                }
                (Some(_), Some(_)) => {
                    return Err(ComposeError::AmbiguousComponent {
                        name,
                        location,
                        architecture: architecture.to_string(),
                    });
                }
            };

            let mut component = found.clone();
            strip_filters(&mut component);

            self.nodes.push(Node {
                component,
                index: found_index,
                original_package_name: package.metadata.name.clone(),
                relative_to_head,
                remote,
                vars: package.variables.clone(),
                consts: package.constants.clone(),
            });
        }
    }

    /// Refuse to visit a package directory or registry reference already in the chain
    fn check_cycle(&self, location: &str, remote: bool) -> Result<()> {
        let revisited = self.nodes.iter().any(|n| match (&n.remote, remote) {
            (Some(url), true) => url == location,
            (None, false) => n.relative_to_head == location,
            _ => false,
        });
        if revisited {
            let mut visited: Vec<String> = self.nodes.iter().map(Node::import_location).collect();
            visited.push(location.to_string());
            return Err(ComposeError::CircularImport {
                chain: visited.join(" -> "),
            });
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn head(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn tail(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    /// Node after `index`, if any
    pub fn next(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index + 1)
    }

    /// Node before `index`, if any
    pub fn prev(&self, index: usize) -> Option<&Node> {
        index.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a chain has at least its head
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for ImportChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.len() == 1 {
            return write!(f, "component {:?} imports nothing", self.head().component.name);
        }
        let links: Vec<String> = self
            .nodes
            .windows(2)
            .map(|pair| {
                let (from, to) = (&pair[0], &pair[1]);
                format!(
                    "component {:?} imports {:?} in {}",
                    from.component.name,
                    to.component.name,
                    to.import_location()
                )
            })
            .collect();
        write!(f, "{}", links.join(", which imports "))
    }
}
