//! Provisioning Orchestrator
//!
//! Sequences one bootstrap pass:
//! 1. Complete the deployment parameters through the secret policy
//! 2. Ensure the credential secrets
//! 3. Ensure the object store
//!
//! The object store consumes the object store secret, so the credential group
//! always finishes first. The first failure ends the pass; objects created
//! before it stay in place and a rerun picks up where this one stopped.

use crate::apply::Applier;
use crate::config::{Credentials, DeploymentParameters};
use crate::domain::ports::{ClusterHandleRef, ProgressEvent, ProgressSinkRef, ProvisioningGroup};
use crate::error::{Error, Result};
use crate::policy::SecretPolicy;
use crate::progress::NoProgress;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Runs a full bootstrap pass against one cluster
pub struct Provisioner {
    applier: Applier,
    policy: SecretPolicy,
    progress: ProgressSinkRef,
}

impl Provisioner {
    pub fn new(cluster: ClusterHandleRef, policy: SecretPolicy) -> Self {
        Self {
            applier: Applier::new(cluster),
            policy,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSinkRef) -> Self {
        self.progress = progress;
        self
    }

    /// Provision every dependency of the admin console in `params.namespace`
    ///
    /// Returns the completed parameters so the caller can keep the generated
    /// credentials for later passes.
    pub async fn provision(&self, params: &DeploymentParameters) -> Result<DeploymentParameters> {
        let (completed, credentials) = self.complete(params)?;
        let namespace = completed.namespace.as_str();

        info!(namespace = %namespace, "Provisioning admin console dependencies");

        self.run_group(
            ProvisioningGroup::Credentials,
            self.applier.ensure_credentials(namespace, &credentials),
        )
        .await?;

        self.run_group(
            ProvisioningGroup::ObjectStore,
            self.applier
                .ensure_object_store(namespace, &completed.object_store),
        )
        .await?;

        info!(namespace = %namespace, "Provisioning complete");
        Ok(completed)
    }

    fn complete(
        &self,
        params: &DeploymentParameters,
    ) -> Result<(DeploymentParameters, Credentials)> {
        self.policy
            .complete(params)
            .and_then(|completed| {
                let credentials = completed.credentials()?;
                Ok((completed, credentials))
            })
            .map_err(|e| Error::Parameters {
                source: Box::new(e),
            })
    }

    async fn run_group<F>(&self, group: ProvisioningGroup, ensure: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        self.progress.report(ProgressEvent::Started(group));
        match ensure.await {
            Ok(()) => {
                self.progress.report(ProgressEvent::Succeeded(group));
                Ok(())
            }
            Err(e) => {
                self.progress.report(ProgressEvent::Failed(group));
                error!("Failed to ensure {}: {}", group, e);
                Err(Error::Provisioning {
                    group,
                    source: Box::new(e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::InMemoryCluster;
    use crate::domain::ports::{ClusterResourceKey, ResourceKind};
    use crate::policy::tests::CountingSource;
    use crate::progress::tests::RecordingProgress;
    use crate::prompt::tests::ScriptedPrompt;
    use crate::resources::{OBJECT_STORE_NAME, SESSION_SECRET_NAME};
    use assert_matches::assert_matches;
    use kube::core::ErrorResponse;

    struct Harness {
        cluster: Arc<InMemoryCluster>,
        source: Arc<CountingSource>,
        progress: Arc<RecordingProgress>,
        provisioner: Provisioner,
    }

    fn harness(prompt: ScriptedPrompt) -> Harness {
        let cluster = Arc::new(InMemoryCluster::new());
        let source = Arc::new(CountingSource::default());
        let progress = Arc::new(RecordingProgress::default());
        let policy = SecretPolicy::new(source.clone(), Arc::new(prompt));
        let provisioner = Provisioner::new(cluster.clone(), policy).with_progress(progress.clone());
        Harness {
            cluster,
            source,
            progress,
            provisioner,
        }
    }

    fn with_password(namespace: &str) -> DeploymentParameters {
        let mut params = DeploymentParameters::new(namespace);
        params.shared_password = Some("hunter22".into());
        params
    }

    #[tokio::test]
    async fn test_fresh_namespace_gets_full_bundle() {
        let h = harness(ScriptedPrompt::entering(&[]));

        let completed = h.provisioner.provision(&with_password("ns1")).await.unwrap();

        let created = h.cluster.created();
        assert_eq!(created.len(), 8);
        let job = ClusterResourceKey::new(ResourceKind::Job, "ns1", OBJECT_STORE_NAME);
        let secrets = created
            .iter()
            .take_while(|k| k.kind == ResourceKind::Secret)
            .count();
        assert_eq!(secrets, 4);
        assert_eq!(created.last(), Some(&job));
        assert_eq!(
            completed.shared_password_bcrypt.as_deref(),
            Some("hashed:hunter22")
        );
    }

    #[tokio::test]
    async fn test_rerun_with_completed_params_is_a_no_op() {
        let h = harness(ScriptedPrompt::entering(&[]));
        let completed = h.provisioner.provision(&with_password("ns1")).await.unwrap();
        h.cluster.clear_calls();

        let again = h.provisioner.provision(&completed).await.unwrap();

        assert_eq!(again, completed);
        assert!(h.cluster.created().is_empty());
        assert_eq!(h.cluster.queried().len(), 8);
        assert_eq!(h.source.hashes.lock().len(), 1);
        assert_eq!(*h.source.tokens.lock(), 4);
    }

    #[tokio::test]
    async fn test_policy_failure_touches_nothing() {
        let h = harness(ScriptedPrompt::new(vec![]));

        let result = h
            .provisioner
            .provision(&DeploymentParameters::new("ns1"))
            .await;

        assert_matches!(result, Err(Error::Parameters { ref source }) if source.is_cancelled());
        assert!(h.cluster.calls().is_empty());
        assert!(h.progress.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_hash_failure_is_reported_as_parameter_error() {
        let cluster = Arc::new(InMemoryCluster::new());
        let source = Arc::new(CountingSource {
            fail_hash: true,
            ..Default::default()
        });
        let policy = SecretPolicy::new(source, Arc::new(ScriptedPrompt::entering(&[])));

        let err = Provisioner::new(cluster.clone(), policy)
            .provision(&with_password("ns1"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "failed to complete deployment parameters");
        assert_matches!(err, Error::Parameters { ref source } if matches!(**source, Error::Hash(_)));
        assert!(!err.is_cancelled());
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_progress_events_bracket_each_group() {
        let h = harness(ScriptedPrompt::entering(&[]));
        h.provisioner.provision(&with_password("ns1")).await.unwrap();

        assert_eq!(
            h.progress.events.lock().as_slice(),
            [
                ProgressEvent::Started(ProvisioningGroup::Credentials),
                ProgressEvent::Succeeded(ProvisioningGroup::Credentials),
                ProgressEvent::Started(ProvisioningGroup::ObjectStore),
                ProgressEvent::Succeeded(ProvisioningGroup::ObjectStore),
            ]
        );
    }

    #[tokio::test]
    async fn test_credential_failure_skips_object_store() {
        let h = harness(ScriptedPrompt::entering(&[]));
        let key = ClusterResourceKey::new(ResourceKind::Secret, "ns1", SESSION_SECRET_NAME);
        h.cluster.fail_get(
            key.clone(),
            ErrorResponse {
                status: "Failure".into(),
                message: "connection refused".into(),
                reason: "ServiceUnavailable".into(),
                code: 503,
            },
        );

        let err = h
            .provisioner
            .provision(&with_password("ns1"))
            .await
            .unwrap_err();

        assert_matches!(
            err,
            Error::Provisioning {
                group: ProvisioningGroup::Credentials,
                ..
            }
        );
        assert_eq!(err.resource_key(), Some(&key));
        assert_eq!(h.cluster.calls().len(), 1);
        assert_eq!(
            h.progress.events.lock().as_slice(),
            [
                ProgressEvent::Started(ProvisioningGroup::Credentials),
                ProgressEvent::Failed(ProvisioningGroup::Credentials),
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_object_store_is_completed_on_rerun() {
        let h = harness(ScriptedPrompt::entering(&[]));
        let service = ClusterResourceKey::new(ResourceKind::Service, "ns1", OBJECT_STORE_NAME);
        h.cluster.fail_create(
            service.clone(),
            ErrorResponse {
                status: "Failure".into(),
                message: "quota exceeded".into(),
                reason: "Forbidden".into(),
                code: 403,
            },
        );

        let err = h
            .provisioner
            .provision(&with_password("ns1"))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            Error::Provisioning {
                group: ProvisioningGroup::ObjectStore,
                ..
            }
        );
        assert_eq!(h.cluster.keys().len(), 6);

        // Injected failures are sticky, so rerun against a copy of what the
        // first pass left behind
        let rerun = Arc::new(InMemoryCluster::new());
        for key in h.cluster.keys() {
            if let Some(object) = h.cluster.object(&key) {
                rerun.insert(object);
            }
        }
        let provisioner = Provisioner::new(
            rerun.clone(),
            SecretPolicy::new(h.source.clone(), Arc::new(ScriptedPrompt::entering(&[]))),
        );
        provisioner.provision(&with_password("ns1")).await.unwrap();

        assert_eq!(
            rerun.created(),
            [
                service,
                ClusterResourceKey::new(ResourceKind::Job, "ns1", OBJECT_STORE_NAME),
            ]
        );
    }
}
