//! Object store builders
//!
//! The store runs as a single-replica StatefulSet behind a ClusterIP Service.
//! A one-shot Job creates the console bucket using the script shipped in the
//! ConfigMap. Credentials are read from the [`OBJECT_STORE_NAME`] secret by
//! name; nothing here looks them up.

use super::{labels, metadata, ResourceDefinition, OBJECT_STORE_NAME};
use crate::config::ObjectStoreSettings;
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource,
    HTTPGetAction, PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec,
    Probe, SecretKeySelector, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Object store API port
pub const OBJECT_STORE_PORT: i32 = 9000;

const DATA_PATH: &str = "/export";
const CONFIG_PATH: &str = "/config";
const INIT_SCRIPT: &str = "initialize.sh";

/// Pod label of the init job; must not match the StatefulSet selector
const INIT_APP_LABEL: &str = "kotsadm-minio-init";

/// Bucket bootstrap script run by the init job
fn init_script(bucket: &str) -> String {
    format!(
        r#"#!/bin/sh
set -e

until mc config host add kotsadm "http://{service}:{port}" "$MINIO_ACCESS_KEY" "$MINIO_SECRET_KEY" >/dev/null 2>&1; do
  echo "waiting for object store"
  sleep 2
done

if mc ls "kotsadm/{bucket}" >/dev/null 2>&1; then
  echo "bucket {bucket} already exists"
else
  mc mb "kotsadm/{bucket}"
fi
"#,
        service = OBJECT_STORE_NAME,
        port = OBJECT_STORE_PORT,
        bucket = bucket,
    )
}

fn credential_env() -> Vec<EnvVar> {
    [("MINIO_ACCESS_KEY", "accesskey"), ("MINIO_SECRET_KEY", "secretkey")]
        .into_iter()
        .map(|(var, key)| EnvVar {
            name: var.to_string(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: Some(OBJECT_STORE_NAME.to_string()),
                    key: key.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect()
}

fn selector() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), OBJECT_STORE_NAME.to_string())])
}

fn health_probe(path: &str) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(OBJECT_STORE_PORT),
            ..Default::default()
        }),
        initial_delay_seconds: Some(5),
        period_seconds: Some(20),
        ..Default::default()
    }
}

/// ConfigMap carrying the bucket bootstrap script
pub fn object_store_config_map(namespace: &str, settings: &ObjectStoreSettings) -> ResourceDefinition {
    ResourceDefinition::ConfigMap(ConfigMap {
        metadata: metadata(namespace, OBJECT_STORE_NAME, OBJECT_STORE_NAME),
        data: Some(BTreeMap::from([(
            INIT_SCRIPT.to_string(),
            init_script(&settings.bucket),
        )])),
        ..Default::default()
    })
}

/// Single-replica StatefulSet running the object store server
pub fn object_store_stateful_set(
    namespace: &str,
    settings: &ObjectStoreSettings,
) -> ResourceDefinition {
    let container = Container {
        name: OBJECT_STORE_NAME.to_string(),
        image: Some(settings.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        args: Some(vec!["server".to_string(), DATA_PATH.to_string()]),
        env: Some(credential_env()),
        ports: Some(vec![ContainerPort {
            name: Some("service".to_string()),
            container_port: OBJECT_STORE_PORT,
            ..Default::default()
        }]),
        volume_mounts: Some(vec![VolumeMount {
            name: OBJECT_STORE_NAME.to_string(),
            mount_path: DATA_PATH.to_string(),
            ..Default::default()
        }]),
        liveness_probe: Some(health_probe("/minio/health/live")),
        readiness_probe: Some(health_probe("/minio/health/ready")),
        ..Default::default()
    };

    let volume_claim = PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(OBJECT_STORE_NAME.to_string()),
            labels: Some(labels(OBJECT_STORE_NAME)),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: settings.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(settings.volume_size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    ResourceDefinition::StatefulSet(StatefulSet {
        metadata: metadata(namespace, OBJECT_STORE_NAME, OBJECT_STORE_NAME),
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            service_name: OBJECT_STORE_NAME.to_string(),
            selector: LabelSelector {
                match_labels: Some(selector()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(OBJECT_STORE_NAME)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            volume_claim_templates: Some(vec![volume_claim]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// ClusterIP Service in front of the object store pods
pub fn object_store_service(namespace: &str) -> ResourceDefinition {
    ResourceDefinition::Service(Service {
        metadata: metadata(namespace, OBJECT_STORE_NAME, OBJECT_STORE_NAME),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(selector()),
            ports: Some(vec![ServicePort {
                name: Some("service".to_string()),
                port: OBJECT_STORE_PORT,
                protocol: Some("TCP".to_string()),
                target_port: Some(IntOrString::String("service".to_string())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// One-shot Job creating the console bucket
pub fn object_store_init_job(namespace: &str, settings: &ObjectStoreSettings) -> ResourceDefinition {
    let container = Container {
        name: "kotsadm-minio-init".to_string(),
        image: Some(settings.client_image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(vec![
            "/bin/sh".to_string(),
            format!("{}/{}", CONFIG_PATH, INIT_SCRIPT),
        ]),
        env: Some(credential_env()),
        volume_mounts: Some(vec![VolumeMount {
            name: "config".to_string(),
            mount_path: CONFIG_PATH.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    ResourceDefinition::Job(Job {
        metadata: metadata(namespace, OBJECT_STORE_NAME, OBJECT_STORE_NAME),
        spec: Some(JobSpec {
            backoff_limit: Some(6),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(INIT_APP_LABEL)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("OnFailure".to_string()),
                    containers: vec![container],
                    volumes: Some(vec![Volume {
                        name: "config".to_string(),
                        config_map: Some(ConfigMapVolumeSource {
                            name: Some(OBJECT_STORE_NAME.to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// The four object store objects, in creation order
pub fn object_store_resources(
    namespace: &str,
    settings: &ObjectStoreSettings,
) -> Vec<ResourceDefinition> {
    vec![
        object_store_config_map(namespace, settings),
        object_store_stateful_set(namespace, settings),
        object_store_service(namespace),
        object_store_init_job(namespace, settings),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_script_targets_configured_bucket() {
        let settings = ObjectStoreSettings {
            bucket: "archives".into(),
            ..Default::default()
        };
        let ResourceDefinition::ConfigMap(cm) = object_store_config_map("ns1", &settings) else {
            panic!("expected config map");
        };
        let script = &cm.data.unwrap()[INIT_SCRIPT];
        assert!(script.contains("mc mb \"kotsadm/archives\""));
        assert!(script.contains("http://kotsadm-minio:9000"));
    }

    #[test]
    fn test_stateful_set_mounts_secret_and_volume() {
        let settings = ObjectStoreSettings {
            volume_size: "10Gi".into(),
            storage_class: Some("fast".into()),
            ..Default::default()
        };
        let ResourceDefinition::StatefulSet(sts) = object_store_stateful_set("ns1", &settings) else {
            panic!("expected stateful set");
        };
        let spec = sts.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.service_name, OBJECT_STORE_NAME);

        let container = &spec.template.spec.as_ref().unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some(settings.image.as_str()));
        let env = container.env.as_ref().unwrap();
        let secret_ref = env[0]
            .value_from
            .as_ref()
            .and_then(|v| v.secret_key_ref.as_ref())
            .unwrap();
        assert_eq!(secret_ref.name.as_deref(), Some(OBJECT_STORE_NAME));
        assert_eq!(secret_ref.key, "accesskey");

        let claim = &spec.volume_claim_templates.unwrap()[0];
        let claim_spec = claim.spec.as_ref().unwrap();
        assert_eq!(claim_spec.storage_class_name.as_deref(), Some("fast"));
        assert_eq!(
            claim_spec.resources.as_ref().unwrap().requests.as_ref().unwrap()["storage"],
            Quantity("10Gi".into())
        );
    }

    #[test]
    fn test_service_selects_store_pods_only() {
        let ResourceDefinition::Service(svc) = object_store_service("ns1") else {
            panic!("expected service");
        };
        let spec = svc.spec.unwrap();
        assert_eq!(spec.selector.unwrap()["app"], OBJECT_STORE_NAME);
        assert_eq!(spec.ports.unwrap()[0].port, OBJECT_STORE_PORT);

        let ResourceDefinition::Job(job) =
            object_store_init_job("ns1", &ObjectStoreSettings::default())
        else {
            panic!("expected job");
        };
        let pod_labels = job.spec.unwrap().template.metadata.unwrap().labels.unwrap();
        assert_ne!(pod_labels["app"], OBJECT_STORE_NAME);
    }

    #[test]
    fn test_job_runs_init_script_from_config_map() {
        let ResourceDefinition::Job(job) =
            object_store_init_job("ns1", &ObjectStoreSettings::default())
        else {
            panic!("expected job");
        };
        let pod = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("OnFailure"));
        assert_eq!(
            pod.containers[0].command.as_ref().unwrap()[1],
            "/config/initialize.sh"
        );
        let volume = &pod.volumes.unwrap()[0];
        assert_eq!(
            volume.config_map.as_ref().unwrap().name.as_deref(),
            Some(OBJECT_STORE_NAME)
        );
    }
}
