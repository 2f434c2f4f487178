//! Idempotent Applier
//!
//! Each ensure operation walks `UNKNOWN -> query -> ABSENT -> create` or
//! `UNKNOWN -> query -> PRESENT`. Present objects are never updated, patched
//! or deleted, and nothing is re-queried after a create. Only a well-formed
//! not-found authorizes creation.
//!
//! The query and the create are two separate calls: a second invocation
//! running concurrently against the same namespace can observe the same
//! not-found, and its create then fails with a conflict.

use crate::cluster::is_not_found;
use crate::config::{Credentials, ObjectStoreSettings};
use crate::domain::ports::{ClusterHandleRef, ClusterResourceKey, ResourceKind};
use crate::error::{Error, Result};
use crate::resources::{
    object_store_config_map, object_store_init_job, object_store_secret, object_store_service,
    object_store_stateful_set, postgres_secret, session_secret, shared_password_secret,
    ResourceDefinition, OBJECT_STORE_NAME, POSTGRES_SECRET_NAME, SESSION_SECRET_NAME,
    SHARED_PASSWORD_SECRET_NAME,
};
use tracing::{debug, info};

/// Result of a single ensure operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyPresent,
    Created,
}

/// Creates missing objects through a [`ClusterHandle`](crate::domain::ports::ClusterHandle)
#[derive(Clone)]
pub struct Applier {
    cluster: ClusterHandleRef,
}

impl Applier {
    pub fn new(cluster: ClusterHandleRef) -> Self {
        Self { cluster }
    }

    /// Create the object named by `key` from `build` unless it already exists
    pub async fn ensure<F>(&self, key: ClusterResourceKey, build: F) -> Result<EnsureOutcome>
    where
        F: FnOnce() -> ResourceDefinition + Send,
    {
        let existing = self.cluster.get(&key).await;
        match existing {
            Ok(()) => {
                debug!("{} already exists", key);
                return Ok(EnsureOutcome::AlreadyPresent);
            }
            Err(e) if is_not_found(&e) => {}
            Err(source) => return Err(Error::Query { key, source }),
        }

        let resource = build();
        debug_assert_eq!(resource.key(), key);

        if let Err(source) = self.cluster.create(&resource).await {
            return Err(Error::Create { key, source });
        }

        info!("Created {}", key);
        Ok(EnsureOutcome::Created)
    }

    // =========================================================================
    // Credential Secrets
    // =========================================================================

    pub async fn ensure_session_secret(
        &self,
        namespace: &str,
        session_key: &str,
    ) -> Result<EnsureOutcome> {
        let key = ClusterResourceKey::new(ResourceKind::Secret, namespace, SESSION_SECRET_NAME);
        self.ensure(key, || session_secret(namespace, session_key))
            .await
    }

    pub async fn ensure_postgres_secret(
        &self,
        namespace: &str,
        password: &str,
    ) -> Result<EnsureOutcome> {
        let key = ClusterResourceKey::new(ResourceKind::Secret, namespace, POSTGRES_SECRET_NAME);
        self.ensure(key, || postgres_secret(namespace, password))
            .await
    }

    pub async fn ensure_shared_password_secret(
        &self,
        namespace: &str,
        password_bcrypt: &str,
    ) -> Result<EnsureOutcome> {
        let key =
            ClusterResourceKey::new(ResourceKind::Secret, namespace, SHARED_PASSWORD_SECRET_NAME);
        self.ensure(key, || shared_password_secret(namespace, password_bcrypt))
            .await
    }

    pub async fn ensure_object_store_secret(
        &self,
        namespace: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<EnsureOutcome> {
        let key = ClusterResourceKey::new(ResourceKind::Secret, namespace, OBJECT_STORE_NAME);
        self.ensure(key, || object_store_secret(namespace, access_key, secret_key))
            .await
    }

    /// Ensure the four credential secrets, stopping at the first failure
    pub async fn ensure_credentials(&self, namespace: &str, credentials: &Credentials) -> Result<()> {
        self.ensure_session_secret(namespace, &credentials.session_key)
            .await?;
        self.ensure_postgres_secret(namespace, &credentials.postgres_password)
            .await?;
        self.ensure_shared_password_secret(namespace, &credentials.shared_password_bcrypt)
            .await?;
        self.ensure_object_store_secret(
            namespace,
            &credentials.object_store_access_key,
            &credentials.object_store_secret_key,
        )
        .await?;
        Ok(())
    }

    // =========================================================================
    // Object Store
    // =========================================================================

    pub async fn ensure_object_store_config_map(
        &self,
        namespace: &str,
        settings: &ObjectStoreSettings,
    ) -> Result<EnsureOutcome> {
        let key = ClusterResourceKey::new(ResourceKind::ConfigMap, namespace, OBJECT_STORE_NAME);
        self.ensure(key, || object_store_config_map(namespace, settings))
            .await
    }

    pub async fn ensure_object_store_stateful_set(
        &self,
        namespace: &str,
        settings: &ObjectStoreSettings,
    ) -> Result<EnsureOutcome> {
        let key = ClusterResourceKey::new(ResourceKind::StatefulSet, namespace, OBJECT_STORE_NAME);
        self.ensure(key, || object_store_stateful_set(namespace, settings))
            .await
    }

    pub async fn ensure_object_store_service(&self, namespace: &str) -> Result<EnsureOutcome> {
        let key = ClusterResourceKey::new(ResourceKind::Service, namespace, OBJECT_STORE_NAME);
        self.ensure(key, || object_store_service(namespace)).await
    }

    pub async fn ensure_object_store_init_job(
        &self,
        namespace: &str,
        settings: &ObjectStoreSettings,
    ) -> Result<EnsureOutcome> {
        let key = ClusterResourceKey::new(ResourceKind::Job, namespace, OBJECT_STORE_NAME);
        self.ensure(key, || object_store_init_job(namespace, settings))
            .await
    }

    /// Ensure the object store objects, stopping at the first failure
    pub async fn ensure_object_store(
        &self,
        namespace: &str,
        settings: &ObjectStoreSettings,
    ) -> Result<()> {
        self.ensure_object_store_config_map(namespace, settings)
            .await?;
        self.ensure_object_store_stateful_set(namespace, settings)
            .await?;
        self.ensure_object_store_service(namespace).await?;
        self.ensure_object_store_init_job(namespace, settings)
            .await?;
        Ok(())
    }
}
