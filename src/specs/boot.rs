//! Guest boot specs

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use crate::config::OsDisk;
use crate::kubevirt::{VirtualMachineClusterInstancetype, VmConfig};
use crate::suite::{Spec, SuiteContext};

/// Boots a guest from its container disk with the matching preference, then
/// waits for it to report Ready.
///
/// The configured instancetype is used unless it falls short of the
/// preference's requirements, in which case the smallest cluster
/// instancetype that meets them is picked instead.
#[derive(Clone, Debug)]
pub struct GuestBootSpec {
    os: OsDisk,
}

impl GuestBootSpec {
    pub fn new(os: OsDisk) -> Self {
        Self { os }
    }

    async fn instancetype_for(&self, ctx: &SuiteContext) -> Result<String> {
        let configured = &ctx.settings.instancetype;
        let preference = self.os.preference();

        let preferences = ctx
            .client
            .list_cluster_preferences()
            .await
            .context("Failed to list cluster preferences")?;
        let Some(requirements) = preferences
            .into_iter()
            .find(|p| p.name_any() == preference)
            .and_then(|p| p.spec.requirements)
        else {
            return Ok(configured.clone());
        };

        let instancetypes = ctx
            .client
            .list_cluster_instancetypes()
            .await
            .context("Failed to list cluster instancetypes")?;
        if instancetypes
            .iter()
            .any(|it| it.name_any() == *configured && it.satisfies(&requirements))
        {
            return Ok(configured.clone());
        }

        let chosen = instancetypes
            .iter()
            .filter(|it| it.satisfies(&requirements))
            .min_by_key(|it| size_key(it))
            .map(|it| it.name_any())
            .with_context(|| {
                format!(
                    "No cluster instancetype meets the requirements of preference {}",
                    preference
                )
            })?;
        info!(
            "Instancetype {} does not meet the requirements of preference {}, using {}",
            configured, preference, chosen
        );
        Ok(chosen)
    }
}

fn size_key(it: &VirtualMachineClusterInstancetype) -> (u32, u64) {
    (it.spec.cpu.guest, it.memory_bytes().unwrap_or(u64::MAX))
}

#[async_trait]
impl Spec for GuestBootSpec {
    fn name(&self) -> String {
        format!(
            "{} guest boots with the {} preference",
            self.os,
            self.os.preference()
        )
    }

    async fn run(&self, ctx: &SuiteContext) -> Result<()> {
        let instancetype = self.instancetype_for(ctx).await?;
        let vm = VmConfig::new(&format!("boot-{}", self.os.id()), &ctx.namespace)
            .image(ctx.disks.image(self.os))
            .instancetype(instancetype)
            .preference(self.os.preference())
            .running(true)
            .build();
        let name = vm.name_any();

        ctx.create_vm(&vm).await?;
        let ready = ctx.wait_for_vm_ready(&name).await;
        let deleted = ctx.delete_vm(&name).await;

        ready?;
        deleted?;
        info!("{} guest booted as {}", self.os, name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::MockClusterClient;
    use crate::kubevirt::{
        VirtualMachineClusterInstancetypeSpec, VirtualMachineClusterPreference,
        VirtualMachineStatus,
    };
    use crate::suite::context::testing::context_with;

    #[test]
    fn test_name_mentions_guest_and_preference() {
        let spec = GuestBootSpec::new(OsDisk::CentosStream9);
        assert_eq!(
            spec.name(),
            "CentOS Stream 9 guest boots with the centos.stream9 preference"
        );
    }

    fn instancetype(name: &str, cpu: u32, memory: &str) -> VirtualMachineClusterInstancetype {
        let mut spec = VirtualMachineClusterInstancetypeSpec::default();
        spec.cpu.guest = cpu;
        spec.memory.guest = memory.to_string();
        VirtualMachineClusterInstancetype::new(name, spec)
    }

    fn windows_preference() -> VirtualMachineClusterPreference {
        let spec = serde_json::from_value(serde_json::json!({
            "requirements": {"cpu": {"guest": 2}, "memory": {"guest": "4Gi"}}
        }))
        .unwrap();
        VirtualMachineClusterPreference::new("windows.11", spec)
    }

    fn u1_series() -> Vec<VirtualMachineClusterInstancetype> {
        vec![
            instancetype("u1.2xlarge", 8, "32Gi"),
            instancetype("u1.medium", 1, "4Gi"),
            instancetype("u1.large", 2, "8Gi"),
            instancetype("u1.xlarge", 4, "16Gi"),
        ]
    }

    /// Mock that boots any VM straight to Ready and records its instancetype
    fn booting_cluster(instancetype: &'static str) -> MockClusterClient {
        let mut mock = MockClusterClient::new();
        mock.expect_create_vm()
            .withf(move |vm| {
                vm.spec.instancetype.as_ref().map(|i| i.name.as_str()) == Some(instancetype)
            })
            .times(1)
            .returning(|vm| Ok(vm.clone()));
        mock.expect_get_vm().returning(|ns, name| {
            let mut vm = VmConfig::new("boot", ns).build();
            vm.metadata.name = Some(name.to_string());
            vm.status = Some(VirtualMachineStatus {
                ready: true,
                ..Default::default()
            });
            Ok(vm)
        });
        mock.expect_delete_vm().times(1).returning(|_, _| Ok(()));
        mock
    }

    #[tokio::test]
    async fn test_instancetype_is_raised_to_meet_preference_requirements() {
        let mut mock = booting_cluster("u1.large");
        mock.expect_list_cluster_preferences()
            .returning(|| Ok(vec![windows_preference()]));
        mock.expect_list_cluster_instancetypes()
            .returning(|| Ok(u1_series()));

        GuestBootSpec::new(OsDisk::ValidationOs)
            .run(&context_with(mock))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_configured_instancetype_kept_when_it_meets_requirements() {
        let mut mock = booting_cluster("u1.medium");
        mock.expect_list_cluster_preferences().returning(|| {
            let spec = serde_json::from_value(serde_json::json!({
                "requirements": {"cpu": {"guest": 1}, "memory": {"guest": "2Gi"}}
            }))
            .unwrap();
            Ok(vec![VirtualMachineClusterPreference::new("fedora", spec)])
        });
        mock.expect_list_cluster_instancetypes()
            .returning(|| Ok(u1_series()));

        GuestBootSpec::new(OsDisk::Fedora)
            .run(&context_with(mock))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_instancetype_meets_requirements() {
        let mut mock = MockClusterClient::new();
        mock.expect_list_cluster_preferences()
            .returning(|| Ok(vec![windows_preference()]));
        mock.expect_list_cluster_instancetypes()
            .returning(|| Ok(vec![instancetype("u1.medium", 1, "4Gi")]));
        mock.expect_create_vm().never();

        let err = GuestBootSpec::new(OsDisk::ValidationOs)
            .run(&context_with(mock))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("preference windows.11"));
    }

    #[tokio::test]
    async fn test_boot_uses_disk_preference_and_instancetype() {
        let mut mock = MockClusterClient::new();
        mock.expect_list_cluster_preferences().returning(|| {
            Ok(vec![VirtualMachineClusterPreference::new(
                "ubuntu",
                Default::default(),
            )])
        });
        mock.expect_list_cluster_instancetypes().never();
        mock.expect_create_vm()
            .withf(|vm| {
                let volume = &vm.spec.template.spec.volumes[0];
                vm.spec.run_strategy.as_deref() == Some("Always")
                    && vm.spec.preference.as_ref().map(|p| p.name.as_str()) == Some("ubuntu")
                    && vm.spec.instancetype.as_ref().map(|i| i.name.as_str()) == Some("u1.medium")
                    && volume.container_disk.as_ref().map(|c| c.image.as_str())
                        == Some("quay.io/containerdisks/ubuntu:20.04")
            })
            .times(1)
            .returning(|vm| Ok(vm.clone()));
        mock.expect_get_vm().returning(|ns, name| {
            let mut vm = VmConfig::new("boot", ns).build();
            vm.metadata.name = Some(name.to_string());
            vm.status = Some(VirtualMachineStatus {
                ready: true,
                ..Default::default()
            });
            Ok(vm)
        });
        mock.expect_delete_vm().times(1).returning(|_, _| Ok(()));

        GuestBootSpec::new(OsDisk::Ubuntu2004)
            .run(&context_with(mock))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_vm_is_deleted_when_guest_never_boots() {
        let mut mock = MockClusterClient::new();
        mock.expect_list_cluster_preferences().returning(|| Ok(vec![]));
        mock.expect_create_vm().returning(|vm| Ok(vm.clone()));
        mock.expect_get_vm().returning(|ns, _| {
            let mut vm = VmConfig::new("boot", ns).build();
            vm.status = Some(VirtualMachineStatus {
                printable_status: Some("ErrImagePull".to_string()),
                ..Default::default()
            });
            Ok(vm)
        });
        mock.expect_delete_vm().times(1).returning(|_, _| Ok(()));

        let err = GuestBootSpec::new(OsDisk::ValidationOs)
            .run(&context_with(mock))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ErrImagePull"));
    }
}
