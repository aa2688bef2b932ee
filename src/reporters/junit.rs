//! JUnit XML reporter

use anyhow::{Context, Result};
use std::fmt::Write;
use std::path::PathBuf;

use super::xml::{counts, escape, seconds, testcases, write_outcome};
use super::{write_report, Reporter};
use crate::models::{SpecState, SuiteReport};

pub struct JUnitReporter {
    path: PathBuf,
}

impl JUnitReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn format(report: &SuiteReport) -> Result<String> {
        let cases = testcases(report);
        let (failures, errors, skipped) = counts(&cases);
        let suite = escape(&report.description);
        let time = seconds(report.duration_ms());
        let mut out = String::new();

        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            out,
            r#"<testsuites tests="{}" failures="{failures}" errors="{errors}" skipped="{skipped}" time="{time}">"#,
            cases.len()
        )?;
        writeln!(
            out,
            r#"  <testsuite name="{suite}" tests="{}" failures="{failures}" errors="{errors}" skipped="{skipped}" time="{time}" timestamp="{}">"#,
            cases.len(),
            report.started_at.format("%Y-%m-%dT%H:%M:%S")
        )?;

        for case in &cases {
            let open = format!(
                r#"    <testcase name="{}" classname="{suite}" time="{}""#,
                escape(&case.name),
                seconds(case.duration_ms)
            );
            if case.state == SpecState::Passed {
                writeln!(out, "{open}/>")?;
            } else {
                writeln!(out, "{open}>")?;
                write_outcome(&mut out, case, "      ")?;
                writeln!(out, "    </testcase>")?;
            }
        }

        writeln!(out, "  </testsuite>")?;
        writeln!(out, "</testsuites>")?;
        Ok(out)
    }
}

impl Reporter for JUnitReporter {
    fn name(&self) -> &str {
        "JUnit"
    }

    fn render(&self, report: &SuiteReport) -> Result<()> {
        let xml = Self::format(report).context("Failed to format JUnit report")?;
        write_report(&self.path, &xml)
    }
}
