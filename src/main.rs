//! instancetype-functests - functional tests for KubeVirt common instancetypes
//!
//! Bootstraps a cluster client, creates a throwaway namespace, checks that
//! cluster instancetypes and preferences are deployed, runs every
//! registered spec and tears the namespace down again.
//!
//! ## Usage
//!
//! ```bash
//! # Run the whole suite against the cluster in $KUBECONFIG
//! instancetype-functests
//!
//! # Boot a locally built Fedora disk and write a JUnit report
//! instancetype-functests --fedora-container-disk registry:5000/fedora:devel \
//!     --junit-output _out/junit.xml
//!
//! # Only the Ubuntu boot specs, two at a time
//! instancetype-functests --focus Ubuntu --concurrency 2
//!
//! # List registered specs
//! instancetype-functests --list-specs
//! ```

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

mod cli;
mod config;
mod k8s;
mod kubevirt;
mod models;
mod reporters;
mod specs;
mod suite;
mod utils;

use cli::Args;
use config::{EnvConfig, SuiteConfig};
use suite::{SuiteContext, SuiteRunner};
use utils::logger::{init_logger, LogLevel};

const SUITE_DESCRIPTION: &str = "Common instancetypes functional test suite";

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let env = EnvConfig::load();

    let requested = args.log_level.as_deref().or(env.log_level.as_deref());
    let level = requested.and_then(LogLevel::from_str).unwrap_or(LogLevel::Info);
    init_logger(level);
    if let Some(requested) = requested.filter(|r| LogLevel::from_str(r).is_none()) {
        warn!("Unknown log level '{}', using info", requested);
    }

    if args.list_specs {
        for spec in specs::registered() {
            println!("{}", spec.name());
        }
        return ExitCode::SUCCESS;
    }

    match run(args, env).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the suite; `Ok(false)` means it ran but did not fully succeed
async fn run(args: Args, env: EnvConfig) -> anyhow::Result<bool> {
    let config = match args.config.as_ref().or(env.config_file.as_ref()) {
        Some(path) => {
            info!("Loading suite settings from {}", path.display());
            SuiteConfig::load(path)?
        }
        None => SuiteConfig::default(),
    };
    let concurrency = args.concurrency.unwrap_or(config.concurrency);

    let disks = args.container_disks();
    for (os, image) in disks.iter() {
        debug!("{} container disk: {}", os, image);
    }

    let client = k8s::connect(env.kubeconfig.as_deref()).await?;
    let context = SuiteContext::new(Arc::new(client), disks, config.specs);

    let report = SuiteRunner::new(SUITE_DESCRIPTION, context)
        .with_specs(specs::registered())
        .with_reporters(reporters::configured(&args.report))
        .concurrency(concurrency)
        .focus(args.focus)
        .skip(args.skip)
        .run()
        .await;

    println!("\n{report}");
    Ok(report.succeeded())
}
