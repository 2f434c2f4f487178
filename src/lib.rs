//! Admin Console Bootstrap
//!
//! Prepares a namespace for the admin console: generates credentials once,
//! stores them in Kubernetes secrets and stands up a MinIO object store that
//! consumes them. The same resource bundle can be rendered to manifests
//! instead of applied.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Provisioning Orchestrator                     │
//! │        complete params ──▶ credential secrets ──▶ object store     │
//! ├───────────────────────────────┬───────────────────────────────────┤
//! │      Secret Material Policy   │        Idempotent Applier          │
//! │  (random tokens, bcrypt hash, │   (query, create only on a        │
//! │   operator password prompt)   │    well-formed not-found)          │
//! ├───────────────────────────────┴───────────────────────────────────┤
//! │                         Resource Builders                          │
//! │      4 Secrets · ConfigMap · StatefulSet · Service · Job           │
//! ├───────────────────────────────┬───────────────────────────────────┤
//! │       Manifest Renderer       │        Cluster Handles             │
//! │        (YAML / JSON)          │   (kube::Api, in-memory)           │
//! └───────────────────────────────┴───────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`resources`]: Pure builders for every managed object
//! - [`policy`]: Generate-once credential policy
//! - [`render`]: Manifest rendering
//! - [`apply`]: Idempotent create-if-absent applier
//! - [`orchestrator`]: Ordered provisioning pass
//! - [`cluster`]: Cluster handle adapters
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod apply;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod progress;
pub mod prompt;
pub mod render;
pub mod resources;

// Re-export commonly used types
pub use apply::{Applier, EnsureOutcome};

pub use cluster::{ClusterCall, InMemoryCluster, KubeCluster};

pub use config::{Credentials, DeploymentParameters, ObjectStoreSettings};

pub use domain::ports::{
    ClusterHandle, ClusterResourceKey, PasswordPrompt, ProgressEvent, ProgressSink,
    PromptResponse, ProvisioningGroup, ResourceKind, SecretSource,
};

pub use error::{Error, Result};

pub use orchestrator::Provisioner;

pub use policy::{SecretPolicy, SystemSecretSource};

pub use progress::{NoProgress, SpinnerProgress, TracingProgress};

pub use prompt::{DisabledPrompt, TerminalPrompt};

pub use render::{render_complete, ManifestFormat, ManifestRenderer, NamedManifestSet};

pub use resources::ResourceDefinition;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
