//! Shared XML helpers for the file reporters

use std::fmt::{self, Write};

use crate::models::{SpecReport, SpecState, SuiteReport};

/// Escape text for use in XML attributes and element content
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn seconds(duration_ms: u64) -> String {
    format!("{:.3}", duration_ms as f64 / 1000.0)
}

/// Specs plus synthetic entries for setup and teardown failures, so the
/// consumers see why nothing ran.
pub fn testcases(report: &SuiteReport) -> Vec<SpecReport> {
    let mut cases = Vec::with_capacity(report.specs.len() + 2);
    if let Some(failure) = &report.setup_failure {
        cases.push(SpecReport::failed("[SuiteSetup]", 0, failure.clone()));
    }
    cases.extend(report.specs.iter().cloned());
    if let Some(failure) = &report.teardown_failure {
        cases.push(SpecReport::failed("[SuiteTeardown]", 0, failure.clone()));
    }
    cases
}

/// Counts over `cases` as (failures, errors, skipped)
pub fn counts(cases: &[SpecReport]) -> (usize, usize, usize) {
    let count = |state| cases.iter().filter(|c| c.state == state).count();
    (
        count(SpecState::Failed),
        count(SpecState::Panicked),
        count(SpecState::Skipped),
    )
}

/// The `<failure>`, `<error>` or `<skipped>` child of a testcase, if any
pub fn write_outcome(out: &mut String, case: &SpecReport, indent: &str) -> fmt::Result {
    let text = match case.state {
        SpecState::Skipped => case.message.as_deref(),
        _ => case.failure.as_deref(),
    };
    let message = escape(text.unwrap_or_default());
    match case.state {
        SpecState::Passed => Ok(()),
        SpecState::Failed => writeln!(
            out,
            "{indent}<failure message=\"{message}\" type=\"Failure\">{message}</failure>"
        ),
        SpecState::Panicked => writeln!(
            out,
            "{indent}<error message=\"{message}\" type=\"Panic\">{message}</error>"
        ),
        SpecState::Skipped => writeln!(out, "{indent}<skipped message=\"{message}\"/>"),
    }
}
