//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Args as ClapArgs, Parser};
use std::path::PathBuf;

use crate::config::disks::{
    DEFAULT_CENTOS_7_CONTAINER_DISK, DEFAULT_CENTOS_STREAM_8_CONTAINER_DISK,
    DEFAULT_CENTOS_STREAM_9_CONTAINER_DISK, DEFAULT_FEDORA_CONTAINER_DISK,
    DEFAULT_UBUNTU_1804_CONTAINER_DISK, DEFAULT_UBUNTU_2004_CONTAINER_DISK,
    DEFAULT_UBUNTU_2204_CONTAINER_DISK, DEFAULT_VALIDATION_OS_CONTAINER_DISK,
};
use crate::config::ContainerDisks;

/// Functional tests for the common KubeVirt instancetypes and preferences
#[derive(Parser, Debug)]
#[command(name = "instancetype-functests")]
#[command(version)]
#[command(about = "Run functional tests against deployed cluster instancetypes and preferences")]
#[command(long_about = None)]
pub struct Args {
    /// Fedora container disk used by the tests
    #[arg(long, default_value = DEFAULT_FEDORA_CONTAINER_DISK)]
    pub fedora_container_disk: String,

    /// CentOS 7 container disk used by the tests
    #[arg(long, default_value = DEFAULT_CENTOS_7_CONTAINER_DISK)]
    pub centos_7_container_disk: String,

    /// CentOS Stream 8 container disk used by the tests
    #[arg(long, default_value = DEFAULT_CENTOS_STREAM_8_CONTAINER_DISK)]
    pub centos_stream_8_container_disk: String,

    /// CentOS Stream 9 container disk used by the tests
    #[arg(long, default_value = DEFAULT_CENTOS_STREAM_9_CONTAINER_DISK)]
    pub centos_stream_9_container_disk: String,

    /// Ubuntu 18.04 container disk used by the tests
    #[arg(long, default_value = DEFAULT_UBUNTU_1804_CONTAINER_DISK)]
    pub ubuntu_1804_container_disk: String,

    /// Ubuntu 20.04 container disk used by the tests
    #[arg(long, default_value = DEFAULT_UBUNTU_2004_CONTAINER_DISK)]
    pub ubuntu_2004_container_disk: String,

    /// Ubuntu 22.04 container disk used by the tests
    #[arg(long, default_value = DEFAULT_UBUNTU_2204_CONTAINER_DISK)]
    pub ubuntu_2204_container_disk: String,

    /// Validation OS container disk used by the tests
    #[arg(long, default_value = DEFAULT_VALIDATION_OS_CONTAINER_DISK)]
    pub validation_os_container_disk: String,

    /// Suite settings file (YAML or JSON); overrides FUNCTEST_CONFIG
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides FUNCTEST_LOG_LEVEL
    #[arg(long)]
    pub log_level: Option<String>,

    /// Maximum number of specs running at once; overrides the settings file
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Only run specs whose name contains this text
    #[arg(long)]
    pub focus: Option<String>,

    /// Skip specs whose name contains this text
    #[arg(long)]
    pub skip: Option<String>,

    /// Print the registered specs and exit
    #[arg(long)]
    pub list_specs: bool,

    #[command(flatten)]
    pub report: ReportArgs,
}

/// Report sink options
#[derive(ClapArgs, Debug, Clone)]
pub struct ReportArgs {
    /// Write a JUnit XML report to this path
    #[arg(long)]
    pub junit_output: Option<PathBuf>,

    /// Write a Polarion XML report
    #[arg(long)]
    pub polarion_execution: bool,

    /// Polarion project id, required by --polarion-execution
    #[arg(long)]
    pub polarion_project_id: Option<String>,

    /// Polarion report file
    #[arg(long, default_value = "polarion_results.xml")]
    pub polarion_report_file: PathBuf,

    /// Polarion "planned in" field
    #[arg(long)]
    pub polarion_custom_plannedin: Option<String>,
}

impl Args {
    pub fn container_disks(&self) -> ContainerDisks {
        ContainerDisks {
            fedora: self.fedora_container_disk.clone(),
            centos_7: self.centos_7_container_disk.clone(),
            centos_stream_8: self.centos_stream_8_container_disk.clone(),
            centos_stream_9: self.centos_stream_9_container_disk.clone(),
            ubuntu_1804: self.ubuntu_1804_container_disk.clone(),
            ubuntu_2004: self.ubuntu_2004_container_disk.clone(),
            ubuntu_2204: self.ubuntu_2204_container_disk.clone(),
            validation_os: self.validation_os_container_disk.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OsDisk;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_omitted_disk_flags_use_defaults() {
        let args = Args::try_parse_from(["instancetype-functests"]).unwrap();
        let expected = [
            (&args.fedora_container_disk, "quay.io/containerdisks/fedora:latest"),
            (&args.centos_7_container_disk, "quay.io/containerdisks/centos:7-2009"),
            (&args.centos_stream_8_container_disk, "quay.io/containerdisks/centos-stream:8"),
            (&args.centos_stream_9_container_disk, "quay.io/containerdisks/centos-stream:9"),
            (&args.ubuntu_1804_container_disk, "quay.io/containerdisks/ubuntu:18.04"),
            (&args.ubuntu_2004_container_disk, "quay.io/containerdisks/ubuntu:20.04"),
            (&args.ubuntu_2204_container_disk, "quay.io/containerdisks/ubuntu:22.04"),
            (
                &args.validation_os_container_disk,
                "registry:5000/validation-os-container-disk:latest",
            ),
        ];
        for (flag, image) in expected {
            assert_eq!(flag, image);
        }
        assert_eq!(args.container_disks(), ContainerDisks::default());
        assert!(!args.list_specs);
        assert!(args.report.junit_output.is_none());
        assert_eq!(
            args.report.polarion_report_file,
            PathBuf::from("polarion_results.xml")
        );
    }

    #[test]
    fn test_each_disk_flag_overrides_one_image() {
        for os in OsDisk::all() {
            let flag = format!("--{}-container-disk", os.id());
            let args = Args::try_parse_from([
                "instancetype-functests",
                flag.as_str(),
                "registry.local/custom:1",
            ])
            .unwrap();
            let disks = args.container_disks();

            for (other, image) in disks.iter() {
                if other == os {
                    assert_eq!(image, "registry.local/custom:1");
                } else {
                    assert_eq!(image, other.default_image());
                }
            }
        }
    }

    #[test]
    fn test_suite_and_reporter_flags() {
        let args = Args::try_parse_from([
            "instancetype-functests",
            "--concurrency",
            "3",
            "--focus",
            "boots",
            "--junit-output",
            "out/junit.xml",
            "--polarion-execution",
            "--polarion-project-id",
            "CNV",
            "--polarion-custom-plannedin",
            "CNV v4.15",
        ])
        .unwrap();

        assert_eq!(args.concurrency, Some(3));
        assert_eq!(args.focus.as_deref(), Some("boots"));
        assert_eq!(args.report.junit_output, Some(PathBuf::from("out/junit.xml")));
        assert!(args.report.polarion_execution);
        assert_eq!(args.report.polarion_project_id.as_deref(), Some("CNV"));
        assert_eq!(
            args.report.polarion_custom_plannedin.as_deref(),
            Some("CNV v4.15")
        );
    }
}
