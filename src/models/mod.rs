//! Data models for suite runs
//!
//! Phases, spec outcomes and the run report consumed by the reporters.

mod report;

pub use report::{PhaseTiming, SpecReport, SpecState, SuitePhase, SuiteReport};
