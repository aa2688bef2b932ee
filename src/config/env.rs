//! Environment variable configuration
//!
//! Resolves the kubeconfig path and optional overrides from the process
//! environment.

use std::env;
use std::path::PathBuf;

/// Variable naming the kubeconfig file, as understood by kubectl
pub const RECOMMENDED_CONFIG_PATH_ENV: &str = "KUBECONFIG";

/// Environment variable prefix
const ENV_PREFIX: &str = "FUNCTEST";

/// Configuration read from environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Kubeconfig from KUBECONFIG
    pub kubeconfig: Option<PathBuf>,
    /// Suite settings file from FUNCTEST_CONFIG
    pub config_file: Option<PathBuf>,
    /// Log level from FUNCTEST_LOG_LEVEL
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    ///
    /// Empty values count as unset.
    pub fn load() -> Self {
        Self {
            kubeconfig: non_empty(RECOMMENDED_CONFIG_PATH_ENV).map(PathBuf::from),
            config_file: get_env("CONFIG").map(PathBuf::from),
            log_level: get_env("LOG_LEVEL"),
        }
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    non_empty(&format!("{ENV_PREFIX}_{name}"))
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Sets variables for the lifetime of the guard and restores the previous
/// values on drop.
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl EnvGuard {
    pub fn set(vars: &[(&str, Option<&str>)]) -> Self {
        let previous = vars
            .iter()
            .map(|(k, _)| (k.to_string(), env::var(k).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        Self { previous }
    }
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
