//! Suite context
//!
//! The one object handed to every phase and spec: the shared cluster
//! client, the test namespace and the immutable run configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ContainerDisks, SpecSettings};
use crate::k8s::ClusterClient;
use crate::kubevirt::VirtualMachine;

/// Namespace owned by a single suite run
pub const TEST_NAMESPACE: &str = "common-instancetype-functest";

#[derive(Clone)]
pub struct SuiteContext {
    pub client: Arc<dyn ClusterClient>,
    pub namespace: String,
    pub disks: ContainerDisks,
    pub settings: SpecSettings,
}

impl SuiteContext {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        disks: ContainerDisks,
        settings: SpecSettings,
    ) -> Self {
        Self {
            client,
            namespace: TEST_NAMESPACE.to_string(),
            disks,
            settings,
        }
    }

    /// Create a VM in the test namespace
    pub async fn create_vm(&self, vm: &VirtualMachine) -> Result<VirtualMachine> {
        let name = vm.metadata.name.as_deref().unwrap_or_default();
        let created = self
            .client
            .create_vm(vm)
            .await
            .with_context(|| format!("Failed to create VirtualMachine {name}"))?;
        debug!("Created VirtualMachine {}/{}", self.namespace, name);
        Ok(created)
    }

    /// Delete a VM, ignoring one that is already gone
    pub async fn delete_vm(&self, name: &str) -> Result<()> {
        match self.client.delete_vm(&self.namespace, name).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete VirtualMachine {name}")),
        }
    }

    /// Poll until the VM reports Ready or the configured timeout expires
    pub async fn wait_for_vm_ready(&self, name: &str) -> Result<VirtualMachine> {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.settings.ready_timeout_secs);
        let interval = Duration::from_secs(self.settings.poll_interval_secs);
        let mut last_status = "Unknown".to_string();

        loop {
            match self.client.get_vm(&self.namespace, name).await {
                Ok(vm) if vm.is_ready() => {
                    info!(
                        "VirtualMachine {}/{} ready after {}s",
                        self.namespace,
                        name,
                        start.elapsed().as_secs()
                    );
                    return Ok(vm);
                }
                Ok(vm) => {
                    last_status = match vm.failure_message() {
                        Some(msg) => format!("{} ({msg})", vm.printable_status()),
                        None => vm.printable_status().to_string(),
                    };
                    debug!("VirtualMachine {}/{} status: {}", self.namespace, name, last_status);
                }
                Err(e) => {
                    warn!("Error checking VirtualMachine {}: {}", name, e);
                    last_status = format!("error: {e}");
                }
            }

            if start.elapsed() >= timeout {
                anyhow::bail!(
                    "VirtualMachine {} not ready after {}s, last status: {}",
                    name,
                    self.settings.ready_timeout_secs,
                    last_status
                );
            }

            sleep(interval).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::k8s::MockClusterClient;

    /// Context around a mock with zero timeouts so waits fail fast
    pub fn context_with(mock: MockClusterClient) -> SuiteContext {
        let settings = SpecSettings {
            ready_timeout_secs: 0,
            poll_interval_secs: 1,
            ..SpecSettings::default()
        };
        SuiteContext::new(Arc::new(mock), ContainerDisks::default(), settings)
    }
}
