//! Cluster client
//!
//! The narrow interface the suite uses to talk to the cluster, and its
//! kube-backed implementation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use std::path::Path;
use tracing::{debug, info};

use super::ClusterError;
use crate::kubevirt::{
    VirtualMachine, VirtualMachineClusterInstancetype, VirtualMachineClusterPreference,
};

/// Every cluster call the suite makes.
///
/// Implementations must be safe to share between concurrently running
/// specs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError>;

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError>;

    async fn list_cluster_instancetypes(
        &self,
    ) -> Result<Vec<VirtualMachineClusterInstancetype>, ClusterError>;

    async fn list_cluster_preferences(
        &self,
    ) -> Result<Vec<VirtualMachineClusterPreference>, ClusterError>;

    async fn create_vm(&self, vm: &VirtualMachine) -> Result<VirtualMachine, ClusterError>;

    async fn get_vm(&self, namespace: &str, name: &str) -> Result<VirtualMachine, ClusterError>;

    async fn delete_vm(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}

/// Resolve the cluster configuration and build a client.
///
/// A kubeconfig path (from `KUBECONFIG`) wins; otherwise kube's own
/// inference is used (in-cluster service account, then `~/.kube/config`).
pub async fn connect(kubeconfig: Option<&Path>) -> Result<KubeClusterClient, ClusterError> {
    let config = match kubeconfig {
        Some(path) => {
            info!("Loading cluster configuration from {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))?
        }
        None => {
            debug!("No kubeconfig path set, inferring cluster configuration");
            Config::infer()
                .await
                .map_err(|e| ClusterError::Config(e.to_string()))?
        }
    };

    debug!("Connecting to {}", config.cluster_url);
    let client = Client::try_from(config).map_err(ClusterError::Client)?;
    Ok(KubeClusterClient::new(client))
}

/// [`ClusterClient`] backed by a kube [`Client`]
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn vms(&self, namespace: &str) -> Api<VirtualMachine> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: kube::api::ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        namespaces
            .create(&PostParams::default(), &namespace)
            .await
            .map_err(|e| {
                ClusterError::classify(e, "Namespace", name, format!("create Namespace {name}"))
            })?;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| {
                ClusterError::classify(e, "Namespace", name, format!("delete Namespace {name}"))
            })?;
        Ok(())
    }

    async fn list_cluster_instancetypes(
        &self,
    ) -> Result<Vec<VirtualMachineClusterInstancetype>, ClusterError> {
        let api: Api<VirtualMachineClusterInstancetype> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(|e| {
            ClusterError::classify(
                e,
                "VirtualMachineClusterInstancetype",
                "*",
                "list VirtualMachineClusterInstancetypes",
            )
        })?;
        Ok(list.items)
    }

    async fn list_cluster_preferences(
        &self,
    ) -> Result<Vec<VirtualMachineClusterPreference>, ClusterError> {
        let api: Api<VirtualMachineClusterPreference> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(|e| {
            ClusterError::classify(
                e,
                "VirtualMachineClusterPreference",
                "*",
                "list VirtualMachineClusterPreferences",
            )
        })?;
        Ok(list.items)
    }

    async fn create_vm(&self, vm: &VirtualMachine) -> Result<VirtualMachine, ClusterError> {
        let name = vm.metadata.name.clone().unwrap_or_default();
        let namespace = vm.metadata.namespace.as_deref().ok_or_else(|| {
            ClusterError::InvalidRequest(format!("VirtualMachine {name} has no namespace"))
        })?;

        self.vms(namespace)
            .create(&PostParams::default(), vm)
            .await
            .map_err(|e| {
                ClusterError::classify(
                    e,
                    "VirtualMachine",
                    &name,
                    format!("create VirtualMachine {namespace}/{name}"),
                )
            })
    }

    async fn get_vm(&self, namespace: &str, name: &str) -> Result<VirtualMachine, ClusterError> {
        self.vms(namespace).get(name).await.map_err(|e| {
            ClusterError::classify(
                e,
                "VirtualMachine",
                name,
                format!("get VirtualMachine {namespace}/{name}"),
            )
        })
    }

    async fn delete_vm(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.vms(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| {
                ClusterError::classify(
                    e,
                    "VirtualMachine",
                    name,
                    format!("delete VirtualMachine {namespace}/{name}"),
                )
            })?;
        debug!("Deleted VirtualMachine {}/{}", namespace, name);
        Ok(())
    }
}
