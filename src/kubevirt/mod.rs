//! KubeVirt resource types
//!
//! Cluster instancetypes and preferences validated by the pre-flight check,
//! and the VirtualMachines created by the specs.

mod instancetype;
mod quantity;
mod vm;

pub use instancetype::{VirtualMachineClusterInstancetype, VirtualMachineClusterPreference};
pub use vm::{VirtualMachine, VmConfig};

#[cfg(test)]
pub use instancetype::VirtualMachineClusterInstancetypeSpec;
#[cfg(test)]
pub use vm::{CpuSpec, VirtualMachineStatus};
