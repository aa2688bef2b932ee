//! Test environment lifecycle
//!
//! Namespace creation, the deployed-resources pre-flight check, and
//! namespace removal. Every cluster call is attempted exactly once.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::SuiteContext;
use crate::k8s::ClusterError;

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("failed to create namespace {namespace}: {source}")]
    NamespaceCreation {
        namespace: String,
        #[source]
        source: ClusterError,
    },

    #[error("failed to list {resource}: {source}")]
    PreflightList {
        resource: &'static str,
        #[source]
        source: ClusterError,
    },

    #[error("no {resource} deployed in the cluster")]
    MissingResources { resource: &'static str },

    #[error("failed to delete namespace {namespace}: {source}")]
    NamespaceDeletion {
        namespace: String,
        #[source]
        source: ClusterError,
    },
}

/// Counts found by the pre-flight check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedResources {
    pub instancetypes: usize,
    pub preferences: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownOutcome {
    Deleted,
    /// Somebody else removed the namespace first
    AlreadyAbsent,
}

/// Create the test namespace.
///
/// An existing namespace is an error: the run must own it exclusively.
pub async fn setup(ctx: &SuiteContext) -> Result<(), SuiteError> {
    ctx.client
        .create_namespace(&ctx.namespace)
        .await
        .map_err(|source| {
            if source.is_already_exists() {
                warn!(
                    "Namespace {} already exists, a previous run was not torn down",
                    ctx.namespace
                );
            }
            SuiteError::NamespaceCreation {
                namespace: ctx.namespace.clone(),
                source,
            }
        })?;
    info!("Created namespace {}", ctx.namespace);
    Ok(())
}

/// Fail fast unless the cluster has instancetypes and preferences deployed
pub async fn preflight(ctx: &SuiteContext) -> Result<DeployedResources, SuiteError> {
    const INSTANCETYPES: &str = "VirtualMachineClusterInstancetypes";
    const PREFERENCES: &str = "VirtualMachineClusterPreferences";

    let instancetypes = ctx
        .client
        .list_cluster_instancetypes()
        .await
        .map_err(|source| SuiteError::PreflightList {
            resource: INSTANCETYPES,
            source,
        })?;
    if instancetypes.is_empty() {
        return Err(SuiteError::MissingResources {
            resource: INSTANCETYPES,
        });
    }

    let preferences = ctx
        .client
        .list_cluster_preferences()
        .await
        .map_err(|source| SuiteError::PreflightList {
            resource: PREFERENCES,
            source,
        })?;
    if preferences.is_empty() {
        return Err(SuiteError::MissingResources {
            resource: PREFERENCES,
        });
    }

    let deployed = DeployedResources {
        instancetypes: instancetypes.len(),
        preferences: preferences.len(),
    };
    info!(
        "Pre-flight passed: {} instancetypes, {} preferences",
        deployed.instancetypes, deployed.preferences
    );
    Ok(deployed)
}

/// Delete the test namespace; a namespace that is already gone is fine
pub async fn teardown(ctx: &SuiteContext) -> Result<TeardownOutcome, SuiteError> {
    match ctx.client.delete_namespace(&ctx.namespace).await {
        Ok(()) => {
            info!("Deleted namespace {}", ctx.namespace);
            Ok(TeardownOutcome::Deleted)
        }
        Err(e) if e.is_not_found() => {
            debug!("Namespace {} already absent", ctx.namespace);
            Ok(TeardownOutcome::AlreadyAbsent)
        }
        Err(source) => Err(SuiteError::NamespaceDeletion {
            namespace: ctx.namespace.clone(),
            source,
        }),
    }
}
