//! Error types for the bootstrap engine
//!
//! Every fatal condition carries enough context (resource kind, namespace,
//! operation) to be diagnosed from the message chain alone.

use crate::domain::ports::{ClusterResourceKey, ProvisioningGroup};
use thiserror::Error;

/// Unified error type for provisioning and rendering
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Cluster Access Errors
    // =========================================================================
    #[error("failed to get existing {key}")]
    Query {
        key: ClusterResourceKey,
        #[source]
        source: kube::Error,
    },

    #[error("failed to create {key}")]
    Create {
        key: ClusterResourceKey,
        #[source]
        source: kube::Error,
    },

    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    // =========================================================================
    // Secret Material Errors
    // =========================================================================
    #[error("failed to bcrypt shared password")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("credential field {field} has no value")]
    MissingCredential { field: &'static str },

    #[error("password prompt cancelled by operator")]
    PromptCancelled,

    #[error("no valid password entered after {attempts} attempts")]
    PromptExhausted { attempts: u32 },

    #[error("no terminal available to ask for the shared password; supply it with --shared-password or SHARED_PASSWORD")]
    PromptUnavailable,

    #[error("failed to complete deployment parameters")]
    Parameters {
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Rendering Errors
    // =========================================================================
    #[error("failed to marshal {document}")]
    Serialization {
        document: String,
        #[source]
        source: SerializationError,
    },

    // =========================================================================
    // Orchestration Errors
    // =========================================================================
    #[error("failed to ensure {group}")]
    Provisioning {
        group: ProvisioningGroup,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("failed to parse parameters file {path}")]
    ParamsFile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoder-specific failure behind [`Error::Serialization`]
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the operator explicitly aborted the pass
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::PromptCancelled => true,
            Error::Provisioning { source, .. } | Error::Parameters { source } => {
                source.is_cancelled()
            }
            _ => false,
        }
    }

    /// The cluster resource a cluster-access error refers to, if any
    pub fn resource_key(&self) -> Option<&ClusterResourceKey> {
        match self {
            Error::Query { key, .. } | Error::Create { key, .. } => Some(key),
            Error::Provisioning { source, .. } => source.resource_key(),
            _ => None,
        }
    }
}

/// Result type alias for the bootstrap engine
pub type Result<T> = std::result::Result<T, Error>;
