//! Manifest Renderer
//!
//! Encodes the fixed resource bundle into named documents for use outside the
//! live cluster. Rendering never contacts the cluster, and a failure on any
//! document aborts the whole render.

use crate::config::DeploymentParameters;
use crate::domain::ports::ResourceKind;
use crate::error::{Error, Result, SerializationError};
use crate::policy::SecretPolicy;
use crate::resources::{
    credential_secrets, object_store_resources, ResourceDefinition, OBJECT_STORE_NAME,
    POSTGRES_SECRET_NAME, SESSION_SECRET_NAME, SHARED_PASSWORD_SECRET_NAME,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

// =============================================================================
// Encoding
// =============================================================================

/// Text encoding of rendered documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Yaml,
    Json,
}

impl ManifestFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ManifestFormat::Yaml => "yaml",
            ManifestFormat::Json => "json",
        }
    }

    fn encode(&self, resource: &ResourceDefinition) -> std::result::Result<Vec<u8>, SerializationError> {
        match self {
            ManifestFormat::Yaml => Ok(serde_yaml::to_string(resource)?.into_bytes()),
            ManifestFormat::Json => {
                let mut out = serde_json::to_vec_pretty(resource)?;
                out.push(b'\n');
                Ok(out)
            }
        }
    }
}

impl std::fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ManifestFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            "json" => Ok(ManifestFormat::Json),
            other => Err(Error::Configuration(format!(
                "unknown manifest format: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Named Manifest Set
// =============================================================================

/// Document name to encoded content, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedManifestSet {
    documents: BTreeMap<String, Vec<u8>>,
}

impl NamedManifestSet {
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.documents.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.documents
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_slice()))
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<u8>> {
        self.documents
    }

    /// All documents joined into one multi-document YAML stream
    pub fn to_stream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, content) in self.iter() {
            out.extend_from_slice(format!("---\n# Source: {}\n", name).as_bytes());
            out.extend_from_slice(content);
            if !content.ends_with(b"\n") {
                out.push(b'\n');
            }
        }
        out
    }

    /// Write every document into `dir`, creating it if needed
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        for (name, content) in self.iter() {
            std::fs::write(dir.join(name), content)?;
            debug!("Wrote {}", dir.join(name).display());
        }
        info!("Wrote {} manifests to {}", self.len(), dir.display());
        Ok(())
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Renders the resource bundle, completing parameters through the policy first
#[derive(Debug, Clone)]
pub struct ManifestRenderer {
    policy: SecretPolicy,
    format: ManifestFormat,
}

impl ManifestRenderer {
    pub fn new(policy: SecretPolicy) -> Self {
        Self {
            policy,
            format: ManifestFormat::default(),
        }
    }

    pub fn with_format(mut self, format: ManifestFormat) -> Self {
        self.format = format;
        self
    }

    /// Complete `params` and render every document
    ///
    /// Returns the completed parameters alongside the set so callers can keep
    /// generated credentials.
    pub fn render(
        &self,
        params: &DeploymentParameters,
    ) -> Result<(NamedManifestSet, DeploymentParameters)> {
        let completed = self
            .policy
            .complete(params)
            .map_err(|e| Error::Parameters {
                source: Box::new(e),
            })?;
        let manifests = render_complete(&completed, self.format)?;
        Ok((manifests, completed))
    }
}

/// Stable document name (without extension) of one bundle member
fn document_stem(resource: &ResourceDefinition) -> Result<&'static str> {
    let key = resource.key();
    let stem = match (key.kind, key.name.as_str()) {
        (ResourceKind::Secret, SESSION_SECRET_NAME) => "secret-jwt",
        (ResourceKind::Secret, POSTGRES_SECRET_NAME) => "secret-pg",
        (ResourceKind::Secret, SHARED_PASSWORD_SECRET_NAME) => "secret-shared-password",
        (ResourceKind::Secret, OBJECT_STORE_NAME) => "secret-s3",
        (ResourceKind::ConfigMap, OBJECT_STORE_NAME) => "minio-configmap",
        (ResourceKind::StatefulSet, OBJECT_STORE_NAME) => "minio-statefulset",
        (ResourceKind::Service, OBJECT_STORE_NAME) => "minio-service",
        (ResourceKind::Job, OBJECT_STORE_NAME) => "minio-job",
        _ => {
            return Err(Error::Configuration(format!(
                "no document name for {}",
                key
            )))
        }
    };
    Ok(stem)
}

/// Render already-completed parameters
///
/// Deterministic: identical inputs produce byte-identical documents.
pub fn render_complete(
    params: &DeploymentParameters,
    format: ManifestFormat,
) -> Result<NamedManifestSet> {
    let creds = params.credentials()?;
    let ns = params.namespace.as_str();

    let bundle = credential_secrets(ns, &creds)
        .into_iter()
        .chain(object_store_resources(ns, &params.object_store));

    let mut documents = BTreeMap::new();
    for resource in bundle {
        let document = format!("{}.{}", document_stem(&resource)?, format.extension());
        let content = format
            .encode(&resource)
            .map_err(|source| Error::Serialization {
                document: document.clone(),
                source,
            })?;
        documents.insert(document, content);
    }

    debug!(namespace = %ns, "Rendered {} documents", documents.len());
    Ok(NamedManifestSet { documents })
}
