//! Package definitions from OCI registries
//!
//! Published packages carry a `skeleton` platform entry holding the raw
//! definition and component sources. Only the `zarf.yaml` layer is pulled.

use oci_distribution::Reference;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol};
use oci_distribution::manifest::{OciImageManifest, OciManifest};
use oci_distribution::secrets::RegistryAuth;
use std::time::Duration;
use tokio::runtime::Runtime;

use zarf_core::{PACKAGE_FILE, Package};

use crate::error::{ComposeError, Result};
use crate::source::{PackageSource, SourceRef};

/// Platform architecture of published skeleton packages
pub const SKELETON_ARCH: &str = "skeleton";

/// Layer annotation naming the file a layer holds
pub const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";

/// Fetches definitions over the OCI distribution API
pub struct OciSource {
    client: Client,
    auth: RegistryAuth,
    timeout: Duration,
    runtime: Runtime,
}

impl OciSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ComposeError::Runtime)?;

        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            ..Default::default()
        };

        Ok(Self {
            client: Client::new(config),
            auth: RegistryAuth::Anonymous,
            timeout,
            runtime,
        })
    }

    /// Parse an `oci://registry/repo:tag` reference
    pub fn parse_reference(url: &str) -> Result<Reference> {
        let clean = url.strip_prefix("oci://").ok_or_else(|| ComposeError::InvalidReference {
            reference: url.to_string(),
            message: "missing oci:// scheme".to_string(),
        })?;

        Reference::try_from(clean).map_err(|e| ComposeError::InvalidReference {
            reference: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_definition(&self, url: &str, reference: &Reference) -> Result<Package> {
        let fetch_err = |e: oci_distribution::errors::OciDistributionError| ComposeError::Fetch {
            reference: url.to_string(),
            message: e.to_string(),
        };

        let (manifest, _) = self
            .client
            .pull_manifest(reference, &self.auth)
            .await
            .map_err(fetch_err)?;

        let image = match manifest {
            OciManifest::Image(image) => image,
            OciManifest::ImageIndex(index) => {
                let entry = index
                    .manifests
                    .iter()
                    .find(|m| {
                        m.platform
                            .as_ref()
                            .is_some_and(|p| p.architecture == SKELETON_ARCH)
                    })
                    .ok_or_else(|| ComposeError::Fetch {
                        reference: url.to_string(),
                        message: format!("no {} platform in image index", SKELETON_ARCH),
                    })?;

                let skeleton = Reference::with_digest(
                    reference.registry().to_string(),
                    reference.repository().to_string(),
                    entry.digest.clone(),
                );
                tracing::debug!(%url, digest = %entry.digest, "resolved skeleton manifest");

                match self
                    .client
                    .pull_manifest(&skeleton, &self.auth)
                    .await
                    .map_err(fetch_err)?
                {
                    (OciManifest::Image(image), _) => image,
                    (OciManifest::ImageIndex(_), _) => {
                        return Err(ComposeError::Fetch {
                            reference: url.to_string(),
                            message: "skeleton entry is itself an image index".to_string(),
                        });
                    }
                }
            }
        };

        let layer = definition_layer(&image).ok_or_else(|| ComposeError::Fetch {
            reference: url.to_string(),
            message: format!("no {} layer in manifest", PACKAGE_FILE),
        })?;

        let mut data: Vec<u8> = Vec::new();
        self.client
            .pull_blob(reference, layer, &mut data)
            .await
            .map_err(fetch_err)?;

        let content = String::from_utf8(data).map_err(|e| ComposeError::Fetch {
            reference: url.to_string(),
            message: format!("{} is not valid UTF-8: {}", PACKAGE_FILE, e),
        })?;

        Package::from_yaml(&content).map_err(|source| ComposeError::ParseDefinition {
            path: format!("{}/{}", url, PACKAGE_FILE),
            source,
        })
    }
}

fn definition_layer(image: &OciImageManifest) -> Option<&oci_distribution::manifest::OciDescriptor> {
    image.layers.iter().find(|layer| {
        layer
            .annotations
            .as_ref()
            .and_then(|a| a.get(TITLE_ANNOTATION))
            .is_some_and(|title| title == PACKAGE_FILE)
    })
}

impl PackageSource for OciSource {
    fn fetch(&self, reference: &SourceRef) -> Result<Package> {
        let url = match reference {
            SourceRef::Oci(url) => url,
            SourceRef::Local(dir) => {
                return Err(ComposeError::UnsupportedSource {
                    source_kind: "OCI",
                    reference: dir.display().to_string(),
                });
            }
        };

        let parsed = Self::parse_reference(url)?;
        tracing::debug!(%url, "fetching package definition from registry");

        let fetched = self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, self.fetch_definition(url, &parsed)).await
        });
        match fetched {
            Ok(result) => result,
            Err(_) => Err(ComposeError::Timeout {
                reference: url.clone(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
