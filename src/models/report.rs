//! Suite run report models
//!
//! Defines spec states, per-spec results and the report handed to the
//! reporters once the suite finishes.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Lifecycle of a suite run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuitePhase {
    Unstarted,
    Setup,
    Running,
    Teardown,
    ReportEmission,
    Terminal,
}

impl fmt::Display for SuitePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuitePhase::Unstarted => "Unstarted",
            SuitePhase::Setup => "Setup",
            SuitePhase::Running => "Running",
            SuitePhase::Teardown => "Teardown",
            SuitePhase::ReportEmission => "ReportEmission",
            SuitePhase::Terminal => "Terminal",
        };
        f.write_str(name)
    }
}

/// Outcome of a single spec
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecState {
    Passed,
    Failed,
    /// The spec panicked (failed assertion)
    Panicked,
    Skipped,
}

impl SpecState {
    pub fn symbol(&self) -> &'static str {
        match self {
            SpecState::Passed => "✓",
            SpecState::Failed => "✗",
            SpecState::Panicked => "!",
            SpecState::Skipped => "○",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SpecState::Failed | SpecState::Panicked)
    }
}

impl fmt::Display for SpecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecState::Passed => write!(f, "PASS"),
            SpecState::Failed => write!(f, "FAIL"),
            SpecState::Panicked => write!(f, "PANIC"),
            SpecState::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Result of a single spec
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpecReport {
    pub name: String,
    pub state: SpecState,
    pub duration_ms: u64,
    /// Error or panic message of a failed spec
    pub failure: Option<String>,
    /// Why a spec did not run
    pub message: Option<String>,
}

impl SpecReport {
    pub fn passed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            state: SpecState::Passed,
            duration_ms,
            failure: None,
            message: None,
        }
    }

    pub fn failed(name: impl Into<String>, duration_ms: u64, failure: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SpecState::Failed,
            duration_ms,
            failure: Some(failure.into()),
            message: None,
        }
    }

    pub fn panicked(name: impl Into<String>, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SpecState::Panicked,
            duration_ms,
            failure: Some(message.into()),
            message: None,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SpecState::Skipped,
            duration_ms: 0,
            failure: None,
            message: Some(reason.into()),
        }
    }

    /// Polarion test id from a `[test_id:<id>]` tag in the name
    pub fn test_id(&self) -> Option<&str> {
        static TEST_ID: OnceLock<Regex> = OnceLock::new();
        let re = TEST_ID.get_or_init(|| {
            Regex::new(r"\[test_id:([A-Za-z0-9_-]+)\]").expect("test id pattern is valid")
        });
        re.captures(&self.name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

impl fmt::Display for SpecReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.state.symbol(),
            self.name,
            self.duration_ms
        )?;
        if let Some(msg) = &self.failure {
            write!(f, " - {msg}")?;
        }
        if let Some(reason) = &self.message {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

/// Time spent in one phase
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub phase: SuitePhase,
    pub duration_ms: u64,
}

/// Everything the reporters get to see about a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteReport {
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub setup_failure: Option<String>,
    pub teardown_failure: Option<String>,
    pub phases: Vec<PhaseTiming>,
    pub specs: Vec<SpecReport>,
}

impl SuiteReport {
    pub fn new(description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            description: description.into(),
            started_at: now,
            finished_at: now,
            setup_failure: None,
            teardown_failure: None,
            phases: Vec::new(),
            specs: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.specs.len()
    }

    pub fn passed(&self) -> usize {
        self.count(|s| s == SpecState::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| s == SpecState::Failed)
    }

    pub fn panicked(&self) -> usize {
        self.count(|s| s == SpecState::Panicked)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| s == SpecState::Skipped)
    }

    fn count(&self, pred: impl Fn(SpecState) -> bool) -> usize {
        self.specs.iter().filter(|s| pred(s.state)).count()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    /// Setup, every spec and teardown all succeeded
    pub fn succeeded(&self) -> bool {
        self.setup_failure.is_none()
            && self.teardown_failure.is_none()
            && !self.specs.iter().any(|s| s.state.is_failure())
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        if let Some(failure) = &self.setup_failure {
            writeln!(f, "  Setup failed: {failure}")?;
        }
        for spec in &self.specs {
            writeln!(f, "  {spec}")?;
        }
        if let Some(failure) = &self.teardown_failure {
            writeln!(f, "  Teardown failed: {failure}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Panic: {} | Skip: {}",
            self.total(),
            self.passed(),
            self.failed(),
            self.panicked(),
            self.skipped()
        )?;
        write!(
            f,
            "Result: {} | Duration: {}ms",
            if self.succeeded() { "SUCCESS" } else { "FAILURE" },
            self.duration_ms()
        )
    }
}
