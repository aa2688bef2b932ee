//! Cluster resource specs
//!
//! Checks on the deployed instancetypes and preferences, and halted
//! VirtualMachines created against each of them.

use anyhow::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::config::OsDisk;
use crate::kubevirt::{VirtualMachine, VirtualMachineClusterPreference, VmConfig};
use crate::suite::{Spec, SuiteContext};

/// Every cluster instancetype declares guest CPU and memory
#[derive(Clone, Debug, Default)]
pub struct InstancetypesWellFormed;

#[async_trait]
impl Spec for InstancetypesWellFormed {
    fn name(&self) -> String {
        "cluster instancetypes are well formed".to_string()
    }

    async fn run(&self, ctx: &SuiteContext) -> Result<()> {
        let instancetypes = ctx.client.list_cluster_instancetypes().await?;
        let mut problems = Vec::new();

        for it in &instancetypes {
            if it.spec.cpu.guest == 0 {
                problems.push(format!("{}: cpu.guest is 0", it.name_any()));
            }
            if it.spec.memory.guest.trim().is_empty() {
                problems.push(format!("{}: memory.guest is empty", it.name_any()));
            }
        }

        if !problems.is_empty() {
            anyhow::bail!("{}", problems.join("; "));
        }
        info!("{} instancetypes well formed", instancetypes.len());
        Ok(())
    }
}

/// A halted VM can be created with every cluster instancetype
#[derive(Clone, Debug, Default)]
pub struct CreateWithEachInstancetype;

#[async_trait]
impl Spec for CreateWithEachInstancetype {
    fn name(&self) -> String {
        "a VirtualMachine can be created with each cluster instancetype".to_string()
    }

    async fn run(&self, ctx: &SuiteContext) -> Result<()> {
        let instancetypes = ctx.client.list_cluster_instancetypes().await?;
        let mut failures = Vec::new();

        for it in &instancetypes {
            let name = it.name_any();
            let vm = VmConfig::new("instancetype", &ctx.namespace)
                .image(ctx.disks.image(OsDisk::Fedora))
                .instancetype(&name)
                .build();

            if let Err(e) = create_and_delete(ctx, vm).await {
                failures.push(format!("{name}: {e:#}"));
            }
        }

        check_failures("instancetypes", instancetypes.len(), failures)
    }
}

/// A halted VM can be created with every cluster preference
#[derive(Clone, Debug, Default)]
pub struct CreateWithEachPreference;

#[async_trait]
impl Spec for CreateWithEachPreference {
    fn name(&self) -> String {
        "a VirtualMachine can be created with each cluster preference".to_string()
    }

    async fn run(&self, ctx: &SuiteContext) -> Result<()> {
        let preferences = ctx.client.list_cluster_preferences().await?;
        let mut failures = Vec::new();

        for preference in &preferences {
            let name = preference.name_any();
            let (vcpus, memory) = sizing_for(preference, ctx);
            let vm = VmConfig::new("preference", &ctx.namespace)
                .image(ctx.disks.image(OsDisk::Fedora))
                .preference(&name)
                .resources(vcpus, memory)
                .cpu_topology(preference.spec.preferred_cpu_topology())
                .build();

            if let Err(e) = create_and_delete(ctx, vm).await {
                failures.push(format!("{name}: {e:#}"));
            }
        }

        check_failures("preferences", preferences.len(), failures)
    }
}

/// vCPUs and memory that satisfy the preference's requirements, falling
/// back to the configured guest size
fn sizing_for(
    preference: &VirtualMachineClusterPreference,
    ctx: &SuiteContext,
) -> (u32, String) {
    let requirements = preference.spec.requirements.as_ref();
    let vcpus = requirements
        .and_then(|r| r.cpu.as_ref())
        .map(|c| c.guest)
        .unwrap_or(ctx.settings.guest_cpu_cores);
    let memory = requirements
        .and_then(|r| r.memory.as_ref())
        .map(|m| m.guest.clone())
        .unwrap_or_else(|| ctx.settings.guest_memory.clone());
    (vcpus, memory)
}

async fn create_and_delete(ctx: &SuiteContext, vm: VirtualMachine) -> Result<()> {
    let name = vm.name_any();
    let created = ctx.create_vm(&vm).await;
    let deleted = ctx.delete_vm(&name).await;
    created?;
    deleted?;
    debug!("VirtualMachine {} created and deleted", name);
    Ok(())
}

fn check_failures(kind: &str, total: usize, failures: Vec<String>) -> Result<()> {
    if failures.is_empty() {
        info!("Created a VirtualMachine with each of {} {}", total, kind);
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} {} failed: {}",
            failures.len(),
            total,
            kind,
            failures.join("; ")
        )
    }
}
