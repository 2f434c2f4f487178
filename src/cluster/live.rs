//! Live cluster handle backed by `kube::Api`

use crate::domain::ports::{ClusterHandle, ClusterResourceKey, ResourceKind};
use crate::error::{Error, Result};
use crate::resources::ResourceDefinition;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::path::Path;
use tracing::debug;

/// Cluster handle talking to the control plane
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the ambient configuration (in-cluster or `KUBECONFIG`),
    /// optionally overriding the kubeconfig file and context
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<String>) -> Result<Self> {
        let options = KubeConfigOptions {
            context,
            ..Default::default()
        };

        let config = match kubeconfig {
            Some(path) => {
                let file = Kubeconfig::read_from(path).map_err(config_error)?;
                Config::from_custom_kubeconfig(file, &options)
                    .await
                    .map_err(config_error)?
            }
            None if options.context.is_some() => {
                Config::from_kubeconfig(&options).await.map_err(config_error)?
            }
            None => Config::infer().await.map_err(config_error)?,
        };

        debug!("Connecting to cluster at {}", config.cluster_url);
        Ok(Self::new(Client::try_from(config)?))
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_named<K>(&self, namespace: &str, name: &str) -> std::result::Result<(), kube::Error>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        self.api::<K>(namespace).get(name).await.map(|_| ())
    }

    async fn create_in<K>(&self, namespace: &str, resource: &K) -> std::result::Result<(), kube::Error>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        <K as Resource>::DynamicType: Default,
    {
        self.api::<K>(namespace)
            .create(&PostParams::default(), resource)
            .await
            .map(|_| ())
    }
}

fn config_error(e: impl std::fmt::Display) -> Error {
    Error::Configuration(format!("failed to load cluster configuration: {}", e))
}

#[async_trait]
impl ClusterHandle for KubeCluster {
    async fn get(&self, key: &ClusterResourceKey) -> std::result::Result<(), kube::Error> {
        let (ns, name) = (key.namespace.as_str(), key.name.as_str());
        match key.kind {
            ResourceKind::Secret => self.get_named::<Secret>(ns, name).await,
            ResourceKind::ConfigMap => self.get_named::<ConfigMap>(ns, name).await,
            ResourceKind::StatefulSet => self.get_named::<StatefulSet>(ns, name).await,
            ResourceKind::Service => self.get_named::<Service>(ns, name).await,
            ResourceKind::Job => self.get_named::<Job>(ns, name).await,
        }
    }

    async fn create(&self, resource: &ResourceDefinition) -> std::result::Result<(), kube::Error> {
        let key = resource.key();
        let ns = key.namespace.as_str();
        match resource {
            ResourceDefinition::Secret(r) => self.create_in(ns, r).await,
            ResourceDefinition::ConfigMap(r) => self.create_in(ns, r).await,
            ResourceDefinition::StatefulSet(r) => self.create_in(ns, r).await,
            ResourceDefinition::Service(r) => self.create_in(ns, r).await,
            ResourceDefinition::Job(r) => self.create_in(ns, r).await,
        }
    }
}
