//! Report sinks
//!
//! Reporters receive the finished [`SuiteReport`] once, after teardown.
//! A reporter error is logged by the runner and never fails the suite.

mod junit;
mod polarion;
mod xml;

pub use junit::JUnitReporter;
pub use polarion::PolarionReporter;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::cli::ReportArgs;
use crate::models::SuiteReport;

pub trait Reporter: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, report: &SuiteReport) -> Result<()>;
}

/// Reporters enabled by the command line
pub fn configured(args: &ReportArgs) -> Vec<Box<dyn Reporter>> {
    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();

    if let Some(path) = &args.junit_output {
        reporters.push(Box::new(JUnitReporter::new(path)));
    }

    if args.polarion_execution {
        match &args.polarion_project_id {
            Some(project_id) if !project_id.is_empty() => {
                reporters.push(Box::new(PolarionReporter::new(
                    &args.polarion_report_file,
                    project_id,
                    args.polarion_custom_plannedin.clone(),
                )));
            }
            _ => warn!(
                "--polarion-execution requires --polarion-project-id, Polarion report disabled"
            ),
        }
    }

    reporters
}

fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
