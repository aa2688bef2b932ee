//! Kubernetes API client module
//!
//! Client bootstrap and the cluster operations used by the suite.

mod client;
mod error;

pub use client::{connect, ClusterClient};
pub use error::ClusterError;

#[cfg(test)]
pub use client::MockClusterClient;
#[cfg(test)]
pub(crate) use error::api_error;
