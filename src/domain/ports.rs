//! Domain Ports - Core trait definitions for the bootstrap engine
//!
//! These traits define the boundaries between the provisioning logic and the
//! collaborators it is handed: the cluster control plane, the source of secret
//! material, the operator prompt and the progress display.

use crate::error::Result;
use crate::resources::ResourceDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Resource Identity
// =============================================================================

/// Object categories managed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Secret,
    ConfigMap,
    StatefulSet,
    Service,
    Job,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Secret => write!(f, "Secret"),
            ResourceKind::ConfigMap => write!(f, "ConfigMap"),
            ResourceKind::StatefulSet => write!(f, "StatefulSet"),
            ResourceKind::Service => write!(f, "Service"),
            ResourceKind::Job => write!(f, "Job"),
        }
    }
}

/// (kind, namespace, name) identity of one live cluster object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterResourceKey {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ClusterResourceKey {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ClusterResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

// =============================================================================
// Cluster Handle Port
// =============================================================================

/// Port for reaching the cluster control plane
///
/// Both operations return the raw `kube::Error` so the applier can tell a
/// well-formed not-found apart from every other failure.
#[async_trait]
pub trait ClusterHandle: Send + Sync {
    /// Fetch the object named by `key`, discarding its body
    async fn get(&self, key: &ClusterResourceKey) -> std::result::Result<(), kube::Error>;

    /// Create `resource` in its namespace
    async fn create(&self, resource: &ResourceDefinition) -> std::result::Result<(), kube::Error>;
}

// =============================================================================
// Secret Source Port
// =============================================================================

/// Port for generating secret material
pub trait SecretSource: Send + Sync {
    /// A fresh random token from a cryptographically strong source
    fn random_token(&self) -> String;

    /// One-way adaptive hash of `plaintext`
    fn hash_password(&self, plaintext: &str) -> Result<String>;
}

// =============================================================================
// Password Prompt Port
// =============================================================================

/// Answer to a single password request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Entered(String),
    /// The operator asked to abort the whole pass
    Cancelled,
    /// Nobody can be asked (no terminal, prompting disabled)
    Unavailable,
}

/// Port for collecting a plaintext password from the operator
pub trait PasswordPrompt: Send + Sync {
    /// Ask once for a password
    fn ask(&self, label: &str) -> std::io::Result<PromptResponse>;

    /// Tell the operator why the previous answer was rejected
    fn reject(&self, reason: &str);
}

// =============================================================================
// Progress Port
// =============================================================================

/// Resource groups sequenced by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningGroup {
    Credentials,
    ObjectStore,
}

impl std::fmt::Display for ProvisioningGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisioningGroup::Credentials => write!(f, "credential secrets"),
            ProvisioningGroup::ObjectStore => write!(f, "object store"),
        }
    }
}

/// Group boundary notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Started(ProvisioningGroup),
    Succeeded(ProvisioningGroup),
    Failed(ProvisioningGroup),
}

/// Observational sink for group boundaries; never influences control flow
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ClusterHandleRef = Arc<dyn ClusterHandle>;
pub type SecretSourceRef = Arc<dyn SecretSource>;
pub type PasswordPromptRef = Arc<dyn PasswordPrompt>;
pub type ProgressSinkRef = Arc<dyn ProgressSink>;
