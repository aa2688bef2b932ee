//! Polarion reporter
//!
//! JUnit XML with the properties the Polarion importer expects. Only specs
//! tagged with `[test_id:<id>]` are exported, as testcase `<project>-<id>`.

use anyhow::{Context, Result};
use std::fmt::Write;
use std::path::PathBuf;

use super::xml::{counts, escape, seconds, write_outcome};
use super::{write_report, Reporter};
use crate::models::{SpecReport, SuiteReport};

pub struct PolarionReporter {
    path: PathBuf,
    project_id: String,
    planned_in: Option<String>,
}

impl PolarionReporter {
    pub fn new(
        path: impl Into<PathBuf>,
        project_id: impl Into<String>,
        planned_in: Option<String>,
    ) -> Self {
        Self {
            path: path.into(),
            project_id: project_id.into(),
            planned_in,
        }
    }

    pub fn format(&self, report: &SuiteReport) -> Result<String> {
        let cases: Vec<(&SpecReport, &str)> = report
            .specs
            .iter()
            .filter_map(|s| s.test_id().map(|id| (s, id)))
            .collect();
        let specs: Vec<SpecReport> = cases.iter().map(|(s, _)| (*s).clone()).collect();
        let (failures, errors, skipped) = counts(&specs);
        let suite = escape(&report.description);
        let mut out = String::new();

        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, "<testsuites>")?;
        writeln!(out, "  <properties>")?;
        let mut property = |name: &str, value: &str| {
            writeln!(
                out,
                r#"    <property name="{name}" value="{}"/>"#,
                escape(value)
            )
        };
        property("polarion-project-id", &self.project_id)?;
        property("polarion-testrun-title", &report.description)?;
        property("polarion-lookup-method", "id")?;
        property("polarion-custom-isautomated", "True")?;
        if let Some(planned_in) = &self.planned_in {
            property("polarion-custom-plannedin", planned_in)?;
        }
        writeln!(out, "  </properties>")?;
        writeln!(
            out,
            r#"  <testsuite name="{suite}" tests="{}" failures="{failures}" errors="{errors}" skipped="{skipped}" time="{}">"#,
            specs.len(),
            seconds(report.duration_ms())
        )?;

        for (spec, id) in &cases {
            writeln!(
                out,
                r#"    <testcase name="{}" classname="{suite}" time="{}">"#,
                escape(&spec.name),
                seconds(spec.duration_ms)
            )?;
            writeln!(out, "      <properties>")?;
            writeln!(
                out,
                r#"        <property name="polarion-testcase-id" value="{}-{}"/>"#,
                escape(&self.project_id),
                escape(id)
            )?;
            writeln!(out, "      </properties>")?;
            write_outcome(&mut out, spec, "      ")?;
            writeln!(out, "    </testcase>")?;
        }

        writeln!(out, "  </testsuite>")?;
        writeln!(out, "</testsuites>")?;
        Ok(out)
    }
}

impl Reporter for PolarionReporter {
    fn name(&self) -> &str {
        "Polarion"
    }

    fn render(&self, report: &SuiteReport) -> Result<()> {
        let xml = self
            .format(report)
            .context("Failed to format Polarion report")?;
        write_report(&self.path, &xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> SuiteReport {
        let mut report = SuiteReport::new("Functional test suite");
        report.specs = vec![
            SpecReport::passed("[test_id:1001] Fedora guest boots", 1000),
            SpecReport::failed("[test_id:1002] CentOS 7 guest boots", 10, "timed out"),
            SpecReport::passed("untagged spec", 5),
        ];
        report
    }

    #[test]
    fn test_only_tagged_specs_are_exported() {
        let reporter = PolarionReporter::new("unused.xml", "CNV", Some("CNV v4.15".to_string()));
        let xml = reporter.format(&sample()).unwrap();

        assert!(xml.contains(r#"<property name="polarion-project-id" value="CNV"/>"#));
        assert!(xml.contains(r#"<property name="polarion-custom-plannedin" value="CNV v4.15"/>"#));
        assert!(xml.contains(r#"tests="2" failures="1" errors="0" skipped="0""#));
        assert!(xml.contains(r#"<property name="polarion-testcase-id" value="CNV-1001"/>"#));
        assert!(xml.contains(r#"<property name="polarion-testcase-id" value="CNV-1002"/>"#));
        assert!(xml.contains(r#"<failure message="timed out" type="Failure">"#));
        assert!(!xml.contains("untagged spec"));
    }

    #[test]
    fn test_plannedin_is_optional() {
        let reporter = PolarionReporter::new("unused.xml", "CNV", None);
        let xml = reporter.format(&sample()).unwrap();
        assert!(!xml.contains("polarion-custom-plannedin"));
    }

    #[test]
    fn test_render_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("polarion_results.xml");

        PolarionReporter::new(&path, "CNV", None)
            .render(&sample())
            .unwrap();

        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("CNV-1001"));
    }
}
