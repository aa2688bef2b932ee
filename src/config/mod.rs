//! Configuration module
//!
//! Handles container disk references, the optional suite settings file,
//! and environment overrides.

pub mod disks;
pub mod env;

pub use disks::{ContainerDisks, OsDisk};
pub use env::EnvConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Suite settings loaded from `--config` / `FUNCTEST_CONFIG`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Maximum number of specs running at once
    pub concurrency: usize,

    /// Settings consumed by the registered specs
    pub specs: SpecSettings,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            specs: SpecSettings::default(),
        }
    }
}

impl SuiteConfig {
    /// Load settings from a YAML (`.yaml`/`.yml`) or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.specs.poll_interval_secs == 0 {
            anyhow::bail!("specs.poll_interval_secs must be at least 1");
        }
        if self.specs.instancetype.is_empty() {
            anyhow::bail!("specs.instancetype must not be empty");
        }
        Ok(())
    }
}

/// Knobs for the VirtualMachine specs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecSettings {
    /// Cluster instancetype used when booting guests
    pub instancetype: String,

    /// Guest memory for VMs sized without an instancetype
    pub guest_memory: String,

    /// Guest CPU cores for VMs sized without an instancetype
    pub guest_cpu_cores: u32,

    /// How long a booting VM may take to report Ready
    pub ready_timeout_secs: u64,

    /// Interval between VM status polls
    pub poll_interval_secs: u64,
}

impl Default for SpecSettings {
    fn default() -> Self {
        Self {
            instancetype: "u1.medium".to_string(),
            guest_memory: "4Gi".to_string(),
            guest_cpu_cores: 2,
            ready_timeout_secs: 300,
            poll_interval_secs: 5,
        }
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
