//! Resource Builders
//!
//! Pure functions mapping (namespace, typed parameters) to cluster object
//! definitions. Builders never contact the cluster and never draw randomness;
//! identical inputs yield identical definitions.
//!
//! - [`secrets`]: the four credential secrets
//! - [`object_store`]: config map, stateful set, service and init job of the
//!   object store

pub mod object_store;
pub mod secrets;

pub use object_store::*;
pub use secrets::*;

use crate::domain::ports::{ClusterResourceKey, ResourceKind};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// Reserved Names
// =============================================================================

/// Session-signing key secret
pub const SESSION_SECRET_NAME: &str = "kotsadm-session";
/// Database credential secret
pub const POSTGRES_SECRET_NAME: &str = "kotsadm-postgres";
/// Console shared password hash secret
pub const SHARED_PASSWORD_SECRET_NAME: &str = "kotsadm-password";
/// Object store keys secret; also the name of every object store object
pub const OBJECT_STORE_NAME: &str = "kotsadm-minio";

/// Value of the `app.kubernetes.io/managed-by` label
pub const MANAGED_BY: &str = "kotsadm-bootstrap";

// =============================================================================
// Resource Definition
// =============================================================================

/// One cluster object to create, consumed by either the renderer or the applier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceDefinition {
    Secret(Secret),
    ConfigMap(ConfigMap),
    StatefulSet(StatefulSet),
    Service(Service),
    Job(Job),
}

impl ResourceDefinition {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDefinition::Secret(_) => ResourceKind::Secret,
            ResourceDefinition::ConfigMap(_) => ResourceKind::ConfigMap,
            ResourceDefinition::StatefulSet(_) => ResourceKind::StatefulSet,
            ResourceDefinition::Service(_) => ResourceKind::Service,
            ResourceDefinition::Job(_) => ResourceKind::Job,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ResourceDefinition::Secret(r) => &r.metadata,
            ResourceDefinition::ConfigMap(r) => &r.metadata,
            ResourceDefinition::StatefulSet(r) => &r.metadata,
            ResourceDefinition::Service(r) => &r.metadata,
            ResourceDefinition::Job(r) => &r.metadata,
        }
    }

    /// Identity of the object this definition creates
    pub fn key(&self) -> ClusterResourceKey {
        let meta = self.metadata();
        ClusterResourceKey::new(
            self.kind(),
            meta.namespace.clone().unwrap_or_default(),
            meta.name.clone().unwrap_or_default(),
        )
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

fn labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), app.to_string()),
        (
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        ),
    ])
}

fn metadata(namespace: &str, name: &str, app: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(labels(app)),
        ..Default::default()
    }
}
