//! Container disk references
//!
//! Maps the guest operating systems exercised by the suite to the
//! container images used as their boot disks.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FEDORA_CONTAINER_DISK: &str = "quay.io/containerdisks/fedora:latest";
pub const DEFAULT_CENTOS_7_CONTAINER_DISK: &str = "quay.io/containerdisks/centos:7-2009";
pub const DEFAULT_CENTOS_STREAM_8_CONTAINER_DISK: &str = "quay.io/containerdisks/centos-stream:8";
pub const DEFAULT_CENTOS_STREAM_9_CONTAINER_DISK: &str = "quay.io/containerdisks/centos-stream:9";
pub const DEFAULT_UBUNTU_1804_CONTAINER_DISK: &str = "quay.io/containerdisks/ubuntu:18.04";
pub const DEFAULT_UBUNTU_2004_CONTAINER_DISK: &str = "quay.io/containerdisks/ubuntu:20.04";
pub const DEFAULT_UBUNTU_2204_CONTAINER_DISK: &str = "quay.io/containerdisks/ubuntu:22.04";
pub const DEFAULT_VALIDATION_OS_CONTAINER_DISK: &str =
    "registry:5000/validation-os-container-disk:latest";

/// Guest operating systems with a configurable container disk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OsDisk {
    Fedora,
    Centos7,
    CentosStream8,
    CentosStream9,
    Ubuntu1804,
    Ubuntu2004,
    Ubuntu2204,
    ValidationOs,
}

impl OsDisk {
    /// Identifier used in the `--<id>-container-disk` flag
    pub fn id(&self) -> &'static str {
        match self {
            OsDisk::Fedora => "fedora",
            OsDisk::Centos7 => "centos-7",
            OsDisk::CentosStream8 => "centos-stream-8",
            OsDisk::CentosStream9 => "centos-stream-9",
            OsDisk::Ubuntu1804 => "ubuntu-1804",
            OsDisk::Ubuntu2004 => "ubuntu-2004",
            OsDisk::Ubuntu2204 => "ubuntu-2204",
            OsDisk::ValidationOs => "validation-os",
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            OsDisk::Fedora => "Fedora",
            OsDisk::Centos7 => "CentOS 7",
            OsDisk::CentosStream8 => "CentOS Stream 8",
            OsDisk::CentosStream9 => "CentOS Stream 9",
            OsDisk::Ubuntu1804 => "Ubuntu 18.04",
            OsDisk::Ubuntu2004 => "Ubuntu 20.04",
            OsDisk::Ubuntu2204 => "Ubuntu 22.04",
            OsDisk::ValidationOs => "Validation OS",
        }
    }

    pub fn default_image(&self) -> &'static str {
        match self {
            OsDisk::Fedora => DEFAULT_FEDORA_CONTAINER_DISK,
            OsDisk::Centos7 => DEFAULT_CENTOS_7_CONTAINER_DISK,
            OsDisk::CentosStream8 => DEFAULT_CENTOS_STREAM_8_CONTAINER_DISK,
            OsDisk::CentosStream9 => DEFAULT_CENTOS_STREAM_9_CONTAINER_DISK,
            OsDisk::Ubuntu1804 => DEFAULT_UBUNTU_1804_CONTAINER_DISK,
            OsDisk::Ubuntu2004 => DEFAULT_UBUNTU_2004_CONTAINER_DISK,
            OsDisk::Ubuntu2204 => DEFAULT_UBUNTU_2204_CONTAINER_DISK,
            OsDisk::ValidationOs => DEFAULT_VALIDATION_OS_CONTAINER_DISK,
        }
    }

    /// Cluster preference a guest of this kind is booted with
    pub fn preference(&self) -> &'static str {
        match self {
            OsDisk::Fedora => "fedora",
            OsDisk::Centos7 => "centos.7",
            OsDisk::CentosStream8 => "centos.stream8",
            OsDisk::CentosStream9 => "centos.stream9",
            OsDisk::Ubuntu1804 | OsDisk::Ubuntu2004 | OsDisk::Ubuntu2204 => "ubuntu",
            OsDisk::ValidationOs => "windows.11",
        }
    }

    pub fn all() -> Vec<OsDisk> {
        vec![
            OsDisk::Fedora,
            OsDisk::Centos7,
            OsDisk::CentosStream8,
            OsDisk::CentosStream9,
            OsDisk::Ubuntu1804,
            OsDisk::Ubuntu2004,
            OsDisk::Ubuntu2204,
            OsDisk::ValidationOs,
        ]
    }
}

impl fmt::Display for OsDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Container disk image per guest operating system.
///
/// Populated once at startup and never mutated afterwards. Values are not
/// validated; a bad reference shows up as an image pull failure in the
/// spec that boots it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainerDisks {
    pub fedora: String,
    pub centos_7: String,
    pub centos_stream_8: String,
    pub centos_stream_9: String,
    pub ubuntu_1804: String,
    pub ubuntu_2004: String,
    pub ubuntu_2204: String,
    pub validation_os: String,
}

impl Default for ContainerDisks {
    fn default() -> Self {
        Self {
            fedora: DEFAULT_FEDORA_CONTAINER_DISK.to_string(),
            centos_7: DEFAULT_CENTOS_7_CONTAINER_DISK.to_string(),
            centos_stream_8: DEFAULT_CENTOS_STREAM_8_CONTAINER_DISK.to_string(),
            centos_stream_9: DEFAULT_CENTOS_STREAM_9_CONTAINER_DISK.to_string(),
            ubuntu_1804: DEFAULT_UBUNTU_1804_CONTAINER_DISK.to_string(),
            ubuntu_2004: DEFAULT_UBUNTU_2004_CONTAINER_DISK.to_string(),
            ubuntu_2204: DEFAULT_UBUNTU_2204_CONTAINER_DISK.to_string(),
            validation_os: DEFAULT_VALIDATION_OS_CONTAINER_DISK.to_string(),
        }
    }
}

impl ContainerDisks {
    /// Image reference for a guest
    pub fn image(&self, os: OsDisk) -> &str {
        match os {
            OsDisk::Fedora => &self.fedora,
            OsDisk::Centos7 => &self.centos_7,
            OsDisk::CentosStream8 => &self.centos_stream_8,
            OsDisk::CentosStream9 => &self.centos_stream_9,
            OsDisk::Ubuntu1804 => &self.ubuntu_1804,
            OsDisk::Ubuntu2004 => &self.ubuntu_2004,
            OsDisk::Ubuntu2204 => &self.ubuntu_2204,
            OsDisk::ValidationOs => &self.validation_os,
        }
    }

    /// Iterate `(guest, image)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (OsDisk, &str)> + '_ {
        OsDisk::all().into_iter().map(move |os| (os, self.image(os)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_images_match_constants() {
        let disks = ContainerDisks::default();
        for os in OsDisk::all() {
            assert_eq!(disks.image(os), os.default_image());
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = OsDisk::all().iter().map(|os| os.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_ubuntu_releases_share_preference() {
        assert_eq!(OsDisk::Ubuntu1804.preference(), "ubuntu");
        assert_eq!(OsDisk::Ubuntu2204.preference(), "ubuntu");
        assert_eq!(OsDisk::CentosStream9.preference(), "centos.stream9");
    }

    #[test]
    fn test_serde_uses_flag_ids() {
        let json = serde_json::to_value(ContainerDisks::default()).unwrap();
        assert_eq!(
            json["centos-stream-8"],
            serde_json::json!(DEFAULT_CENTOS_STREAM_8_CONTAINER_DISK)
        );
        assert_eq!(
            json["ubuntu-2004"],
            serde_json::json!(DEFAULT_UBUNTU_2004_CONTAINER_DISK)
        );
    }
}
