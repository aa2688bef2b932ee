//! VirtualMachine resource
//!
//! Typed subset of the KubeVirt VirtualMachine used by the specs, plus a
//! builder for container-disk guests sized by an instancetype and/or
//! shaped by a preference.

use kube::CustomResource;
use rand::{distr::Alphanumeric, Rng};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CLUSTER_INSTANCETYPE_KIND: &str = "VirtualMachineClusterInstancetype";
pub const CLUSTER_PREFERENCE_KIND: &str = "VirtualMachineClusterPreference";

/// Label put on every VM the suite creates
pub const SUITE_LABEL: &str = "functest.instancetype.kubevirt.io/suite";

/// VirtualMachine custom resource specification
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "kubevirt.io",
    version = "v1",
    kind = "VirtualMachine",
    plural = "virtualmachines",
    shortname = "vm",
    namespaced,
    status = "VirtualMachineStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSpec {
    /// Run strategy (Always, Halted, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_strategy: Option<String>,

    /// Instancetype providing CPU and memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instancetype: Option<Matcher>,

    /// Preference providing device and feature defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<Matcher>,

    /// Template for the VMI
    pub template: VmiTemplate,
}

/// Reference to an instancetype or preference
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// VMI Template specification
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VmiTemplate {
    pub spec: VmiTemplateSpec,
}

/// VMI Template spec
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VmiTemplateSpec {
    pub domain: DomainSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_grace_period_seconds: Option<i64>,
}

/// Domain specification for the VM
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySpec>,

    pub devices: DevicesSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CpuSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sockets: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
}

/// Topology axis that carries a guest's vCPUs.
///
/// KubeVirt checks a preference's CPU requirement against the axis named by
/// its `preferredCPUTopology`, which defaults to sockets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CpuTopology {
    #[default]
    Sockets,
    Cores,
    Threads,
}

impl CpuTopology {
    /// Parse a `preferredCPUTopology` value. Spread and any count sockets
    /// when the other axes are left at 1.
    pub fn from_preferred(value: &str) -> Self {
        match value {
            "preferCores" | "cores" => CpuTopology::Cores,
            "preferThreads" | "threads" => CpuTopology::Threads,
            _ => CpuTopology::Sockets,
        }
    }

    /// A CPU spec with `vcpus` on this axis
    pub fn cpu_spec(self, vcpus: u32) -> CpuSpec {
        let mut cpu = CpuSpec::default();
        match self {
            CpuTopology::Sockets => cpu.sockets = Some(vcpus),
            CpuTopology::Cores => cpu.cores = Some(vcpus),
            CpuTopology::Threads => cpu.threads = Some(vcpus),
        }
        cpu
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemorySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<String>,
}

/// Devices specification
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevicesSpec {
    /// Disk devices; bus left unset so the preference decides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<Disk>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    /// Disk name (must match volume name)
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_disk: Option<ContainerDiskSource>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDiskSource {
    /// Container image
    pub image: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
}

/// VirtualMachine status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineStatus {
    #[serde(default)]
    pub created: bool,

    #[serde(default)]
    pub ready: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub printable_status: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<VmCondition>,
}

/// VM condition
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VmCondition {
    #[serde(rename = "type")]
    pub condition_type: String,

    /// Condition status (True, False, Unknown)
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VirtualMachine {
    /// Whether the VM reports Ready
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().map(|s| s.ready).unwrap_or(false)
    }

    /// Printable status, or "Unknown" before the controller reports one
    pub fn printable_status(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.printable_status.as_deref())
            .unwrap_or("Unknown")
    }

    /// Message of the first False condition, if any
    pub fn failure_message(&self) -> Option<String> {
        self.status.as_ref().and_then(|s| {
            s.conditions
                .iter()
                .find(|c| c.status == "False" && c.message.is_some())
                .map(|c| format!("{}: {}", c.condition_type, c.message.clone().unwrap_or_default()))
        })
    }
}

/// Builder for the VMs created by the specs
#[derive(Clone, Debug)]
pub struct VmConfig {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub instancetype: Option<String>,
    pub preference: Option<String>,
    pub vcpus: Option<u32>,
    pub cpu_topology: CpuTopology,
    pub memory: Option<String>,
    pub running: bool,
    pub labels: BTreeMap<String, String>,
}

impl VmConfig {
    /// Create a config with a random name derived from `prefix`
    pub fn new(prefix: &str, namespace: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(SUITE_LABEL.to_string(), "true".to_string());

        Self {
            name: random_name(prefix),
            namespace: namespace.into(),
            image: crate::config::OsDisk::Fedora.default_image().to_string(),
            instancetype: None,
            preference: None,
            vcpus: None,
            cpu_topology: CpuTopology::default(),
            memory: None,
            running: false,
            labels,
        }
    }

    /// Set container disk image
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Size the guest with a cluster instancetype
    pub fn instancetype(mut self, name: impl Into<String>) -> Self {
        self.instancetype = Some(name.into());
        self
    }

    /// Shape the guest with a cluster preference
    pub fn preference(mut self, name: impl Into<String>) -> Self {
        self.preference = Some(name.into());
        self
    }

    /// Size the guest directly; ignored when an instancetype is set
    pub fn resources(mut self, vcpus: u32, memory: impl Into<String>) -> Self {
        self.vcpus = Some(vcpus);
        self.memory = Some(memory.into());
        self
    }

    /// Axis the vCPUs from [`resources`](Self::resources) are placed on
    pub fn cpu_topology(mut self, topology: CpuTopology) -> Self {
        self.cpu_topology = topology;
        self
    }

    /// Start the VM on creation
    pub fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    /// Build the VirtualMachine resource
    pub fn build(self) -> VirtualMachine {
        // KubeVirt rejects domain CPU/memory alongside an instancetype
        let (cpu, memory) = if self.instancetype.is_some() {
            (None, None)
        } else {
            (
                self.vcpus.map(|vcpus| self.cpu_topology.cpu_spec(vcpus)),
                self.memory.map(|guest| MemorySpec { guest: Some(guest) }),
            )
        };

        VirtualMachine {
            metadata: kube::api::ObjectMeta {
                name: Some(self.name),
                namespace: Some(self.namespace),
                labels: Some(self.labels),
                ..Default::default()
            },
            spec: VirtualMachineSpec {
                run_strategy: Some(if self.running { "Always" } else { "Halted" }.to_string()),
                instancetype: self.instancetype.map(|name| Matcher {
                    name,
                    kind: Some(CLUSTER_INSTANCETYPE_KIND.to_string()),
                }),
                preference: self.preference.map(|name| Matcher {
                    name,
                    kind: Some(CLUSTER_PREFERENCE_KIND.to_string()),
                }),
                template: VmiTemplate {
                    spec: VmiTemplateSpec {
                        domain: DomainSpec {
                            cpu,
                            memory,
                            devices: DevicesSpec {
                                disks: vec![Disk {
                                    name: "containerdisk".to_string(),
                                }],
                            },
                        },
                        volumes: vec![Volume {
                            name: "containerdisk".to_string(),
                            container_disk: Some(ContainerDiskSource {
                                image: self.image,
                                image_pull_policy: Some("IfNotPresent".to_string()),
                            }),
                        }],
                        termination_grace_period_seconds: Some(0),
                    },
                },
            },
            status: None,
        }
    }
}

/// `<prefix>-<5 random lowercase alphanumerics>`, valid as a DNS-1123 label
/// as long as the prefix is.
pub fn random_name(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{prefix}-{suffix}")
}
