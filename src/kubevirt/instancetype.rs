//! Cluster-scoped instancetype and preference resources
//!
//! Only the fields the suite inspects are typed; everything else is kept
//! as raw JSON so unknown fields from newer API versions round-trip.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::quantity::parse_bytes;
use super::vm::CpuTopology;

/// VirtualMachineClusterInstancetype specification
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "instancetype.kubevirt.io",
    version = "v1beta1",
    kind = "VirtualMachineClusterInstancetype",
    plural = "virtualmachineclusterinstancetypes",
    shortname = "vmcit"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineClusterInstancetypeSpec {
    /// Guest CPU
    pub cpu: CpuInstancetype,

    /// Guest memory
    pub memory: MemoryInstancetype,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads_policy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CpuInstancetype {
    /// Number of vCPUs exposed to the guest
    pub guest: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_cpu_placement: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInstancetype {
    /// Guest memory quantity (e.g. "2Gi")
    pub guest: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hugepages: Option<serde_json::Value>,
}

impl VirtualMachineClusterInstancetype {
    /// Whether this instancetype provides at least what `requirements` ask
    /// for. Unparsable memory quantities never satisfy a memory requirement.
    pub fn satisfies(&self, requirements: &PreferenceRequirements) -> bool {
        let cpu_ok = requirements
            .cpu
            .as_ref()
            .map(|cpu| self.spec.cpu.guest >= cpu.guest)
            .unwrap_or(true);
        let memory_ok = requirements
            .memory
            .as_ref()
            .map(|memory| {
                match (parse_bytes(&self.spec.memory.guest), parse_bytes(&memory.guest)) {
                    (Some(have), Some(need)) => have >= need,
                    _ => false,
                }
            })
            .unwrap_or(true);
        cpu_ok && memory_ok
    }

    /// Guest memory in bytes, if the quantity parses
    pub fn memory_bytes(&self) -> Option<u64> {
        parse_bytes(&self.spec.memory.guest)
    }
}

/// VirtualMachineClusterPreference specification
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "instancetype.kubevirt.io",
    version = "v1beta1",
    kind = "VirtualMachineClusterPreference",
    plural = "virtualmachineclusterpreferences",
    shortname = "vmcp"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineClusterPreferenceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<serde_json::Value>,

    /// Minimum resources an instancetype must provide
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<PreferenceRequirements>,
}

impl VirtualMachineClusterPreferenceSpec {
    /// Axis named by `cpu.preferredCPUTopology`, sockets when unset
    pub fn preferred_cpu_topology(&self) -> CpuTopology {
        self.cpu
            .as_ref()
            .and_then(|cpu| cpu.get("preferredCPUTopology"))
            .and_then(|value| value.as_str())
            .map(CpuTopology::from_preferred)
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRequirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuRequirement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryRequirement>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
pub struct CpuRequirement {
    pub guest: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
pub struct MemoryRequirement {
    pub guest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    #[test]
    fn test_instancetype_deserialize() {
        let it: VirtualMachineClusterInstancetype = serde_json::from_value(serde_json::json!({
            "apiVersion": "instancetype.kubevirt.io/v1beta1",
            "kind": "VirtualMachineClusterInstancetype",
            "metadata": {"name": "u1.medium"},
            "spec": {"cpu": {"guest": 1}, "memory": {"guest": "4Gi"}}
        }))
        .unwrap();

        assert_eq!(it.metadata.name.as_deref(), Some("u1.medium"));
        assert_eq!(it.spec.cpu.guest, 1);
        assert_eq!(it.spec.memory.guest, "4Gi");
    }

    #[test]
    fn test_preference_keeps_untyped_sections() {
        let pref: VirtualMachineClusterPreference = serde_json::from_value(serde_json::json!({
            "apiVersion": "instancetype.kubevirt.io/v1beta1",
            "kind": "VirtualMachineClusterPreference",
            "metadata": {"name": "fedora"},
            "spec": {
                "devices": {"preferredDiskBus": "virtio"},
                "requirements": {"cpu": {"guest": 1}, "memory": {"guest": "2Gi"}}
            }
        }))
        .unwrap();

        let requirements = pref.spec.requirements.unwrap();
        assert_eq!(requirements.memory.unwrap().guest, "2Gi");
        assert_eq!(
            pref.spec.devices.unwrap()["preferredDiskBus"],
            serde_json::json!("virtio")
        );
    }

    fn instancetype(cpu: u32, memory: &str) -> VirtualMachineClusterInstancetype {
        let mut spec = VirtualMachineClusterInstancetypeSpec::default();
        spec.cpu.guest = cpu;
        spec.memory.guest = memory.to_string();
        VirtualMachineClusterInstancetype::new("it", spec)
    }

    fn requirements(cpu: u32, memory: &str) -> PreferenceRequirements {
        serde_json::from_value(serde_json::json!({
            "cpu": {"guest": cpu},
            "memory": {"guest": memory}
        }))
        .unwrap()
    }

    #[test]
    fn test_instancetype_satisfies_requirements() {
        let windows = requirements(2, "4Gi");
        assert!(!instancetype(1, "4Gi").satisfies(&windows));
        assert!(!instancetype(2, "2Gi").satisfies(&windows));
        assert!(instancetype(2, "8Gi").satisfies(&windows));
        assert!(instancetype(1, "1Gi").satisfies(&PreferenceRequirements::default()));
    }

    #[test]
    fn test_unparsable_memory_never_satisfies() {
        assert!(!instancetype(4, "plenty").satisfies(&requirements(1, "1Gi")));
    }

    #[test]
    fn test_preferred_cpu_topology() {
        let spec: VirtualMachineClusterPreferenceSpec = serde_json::from_value(serde_json::json!({
            "cpu": {"preferredCPUTopology": "preferCores"}
        }))
        .unwrap();
        assert_eq!(spec.preferred_cpu_topology(), CpuTopology::Cores);
        assert_eq!(
            VirtualMachineClusterPreferenceSpec::default().preferred_cpu_topology(),
            CpuTopology::Sockets
        );
    }

    #[test]
    fn test_resources_are_cluster_scoped() {
        assert_eq!(
            VirtualMachineClusterInstancetype::group(&()),
            "instancetype.kubevirt.io"
        );
        assert_eq!(
            VirtualMachineClusterPreference::plural(&()),
            "virtualmachineclusterpreferences"
        );
    }
}
