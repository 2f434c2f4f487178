//! Deployment parameters and object store settings
//!
//! [`DeploymentParameters`] is the single input of a provisioning pass. Its
//! credential fields may start empty; the secret policy returns a completed
//! copy. A completed value can be saved as YAML and fed back on the next
//! invocation so credentials are not rotated.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// =============================================================================
// Object Store Settings
// =============================================================================

/// Settings for the in-cluster object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectStoreSettings {
    /// Object store server image
    pub image: String,
    /// Client image used by the bucket initialization job
    pub client_image: String,
    /// Size of the data volume claim
    pub volume_size: String,
    /// Storage class for the data volume (cluster default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Bucket created by the initialization job
    pub bucket: String,
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            image: "minio/minio:RELEASE.2019-10-12T01-39-57Z".to_string(),
            client_image: "minio/mc:RELEASE.2019-10-09T22-54-57Z".to_string(),
            volume_size: "4Gi".to_string(),
            storage_class: None,
            bucket: "kotsadm".to_string(),
        }
    }
}

// =============================================================================
// Deployment Parameters
// =============================================================================

/// Input of one provisioning pass
///
/// `None` and blank strings both mean "absent".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentParameters {
    #[serde(default)]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres_password: Option<String>,

    /// Console shared password in plaintext; read but never written back
    #[serde(default, skip_serializing)]
    pub shared_password: Option<String>,

    /// bcrypt hash of `shared_password`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_password_bcrypt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_store_access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_store_secret_key: Option<String>,

    #[serde(default)]
    pub object_store: ObjectStoreSettings,
}

impl DeploymentParameters {
    /// Parameters for `namespace` with every credential left to the policy
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Load parameters from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let params = serde_yaml::from_str(&raw).map_err(|source| Error::ParamsFile {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Loaded deployment parameters from {}", path.display());
        Ok(params)
    }

    /// Write parameters to a YAML file, replacing its contents
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_yaml::to_string(self).map_err(|source| Error::ParamsFile {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, raw)?;
        debug!("Saved deployment parameters to {}", path.display());
        Ok(())
    }

    /// Completed view of the credential fields
    ///
    /// Fails on the first field that is still absent.
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            session_key: required(&self.session_key, "sessionKey")?,
            postgres_password: required(&self.postgres_password, "postgresPassword")?,
            shared_password_bcrypt: required(&self.shared_password_bcrypt, "sharedPasswordBcrypt")?,
            object_store_access_key: required(
                &self.object_store_access_key,
                "objectStoreAccessKey",
            )?,
            object_store_secret_key: required(
                &self.object_store_secret_key,
                "objectStoreSecretKey",
            )?,
        })
    }
}

impl std::fmt::Debug for DeploymentParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentParameters")
            .field("namespace", &self.namespace)
            .field("session_key", &Redacted(&self.session_key))
            .field("postgres_password", &Redacted(&self.postgres_password))
            .field("shared_password", &Redacted(&self.shared_password))
            .field("shared_password_bcrypt", &Redacted(&self.shared_password_bcrypt))
            .field("object_store_access_key", &Redacted(&self.object_store_access_key))
            .field("object_store_secret_key", &Redacted(&self.object_store_secret_key))
            .field("object_store", &self.object_store)
            .finish()
    }
}

/// Whether an optional credential field carries a usable value
pub fn is_present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.is_empty())
}

fn required(field: &Option<String>, name: &'static str) -> Result<String> {
    match field {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(Error::MissingCredential { field: name }),
    }
}

struct Redacted<'a>(&'a Option<String>);

impl std::fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if is_present(self.0) {
            write!(f, "<redacted>")
        } else {
            write!(f, "<unset>")
        }
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Credential material required by the secret builders
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub session_key: String,
    pub postgres_password: String,
    pub shared_password_bcrypt: String,
    pub object_store_access_key: String,
    pub object_store_secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}
