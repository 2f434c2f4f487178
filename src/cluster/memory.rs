//! In-process cluster handle
//!
//! Answers like an API server would (404 on missing objects, 409 on duplicate
//! creates) and records every call. Used by `apply --dry-run`, tests and
//! benchmarks.

use super::{already_exists_response, not_found_response};
use crate::domain::ports::{ClusterHandle, ClusterResourceKey};
use crate::resources::ResourceDefinition;
use async_trait::async_trait;
use kube::core::ErrorResponse;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// One recorded call against the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Get(ClusterResourceKey),
    Create(ClusterResourceKey),
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ClusterResourceKey, ResourceDefinition>,
    calls: Vec<ClusterCall>,
    get_failures: BTreeMap<ClusterResourceKey, ErrorResponse>,
    create_failures: BTreeMap<ClusterResourceKey, ErrorResponse>,
}

/// Recording in-memory cluster
#[derive(Default)]
pub struct InMemoryCluster {
    state: RwLock<State>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing object without recording a call
    pub fn insert(&self, resource: ResourceDefinition) {
        self.state.write().objects.insert(resource.key(), resource);
    }

    /// Make every `get` of `key` fail with `response`
    pub fn fail_get(&self, key: ClusterResourceKey, response: ErrorResponse) {
        self.state.write().get_failures.insert(key, response);
    }

    /// Make every `create` of `key` fail with `response`
    pub fn fail_create(&self, key: ClusterResourceKey, response: ErrorResponse) {
        self.state.write().create_failures.insert(key, response);
    }

    pub fn contains(&self, key: &ClusterResourceKey) -> bool {
        self.state.read().objects.contains_key(key)
    }

    pub fn object(&self, key: &ClusterResourceKey) -> Option<ResourceDefinition> {
        self.state.read().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<ClusterResourceKey> {
        self.state.read().objects.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.state.read().calls.clone()
    }

    /// Keys created so far, in creation order
    pub fn created(&self) -> Vec<ClusterResourceKey> {
        self.state
            .read()
            .calls
            .iter()
            .filter_map(|call| match call {
                ClusterCall::Create(key) => Some(key.clone()),
                ClusterCall::Get(_) => None,
            })
            .collect()
    }

    pub fn queried(&self) -> Vec<ClusterResourceKey> {
        self.state
            .read()
            .calls
            .iter()
            .filter_map(|call| match call {
                ClusterCall::Get(key) => Some(key.clone()),
                ClusterCall::Create(_) => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.write().calls.clear();
    }
}

#[async_trait]
impl ClusterHandle for InMemoryCluster {
    async fn get(&self, key: &ClusterResourceKey) -> Result<(), kube::Error> {
        let mut state = self.state.write();
        state.calls.push(ClusterCall::Get(key.clone()));

        if let Some(response) = state.get_failures.get(key) {
            return Err(kube::Error::Api(response.clone()));
        }
        if state.objects.contains_key(key) {
            Ok(())
        } else {
            Err(kube::Error::Api(not_found_response(key)))
        }
    }

    async fn create(&self, resource: &ResourceDefinition) -> Result<(), kube::Error> {
        let key = resource.key();
        let mut state = self.state.write();
        state.calls.push(ClusterCall::Create(key.clone()));

        if let Some(response) = state.create_failures.get(&key) {
            return Err(kube::Error::Api(response.clone()));
        }
        if state.objects.contains_key(&key) {
            return Err(kube::Error::Api(already_exists_response(&key)));
        }
        state.objects.insert(key, resource.clone());
        Ok(())
    }
}
