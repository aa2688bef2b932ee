//! Timer utilities
//!
//! Spec timers and per-phase timing for the suite runner.

use std::time::{Duration, Instant};

use crate::models::{PhaseTiming, SuitePhase};

/// Simple timer for measuring elapsed time
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and return elapsed milliseconds
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("{}: {}ms", self.label, elapsed);
        elapsed
    }
}

/// Records how long each suite phase took.
///
/// Entering a phase closes the one before it.
#[derive(Debug)]
pub struct PhaseClock {
    current: Option<(SuitePhase, Instant)>,
    laps: Vec<(SuitePhase, Duration)>,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self {
            current: None,
            laps: Vec::new(),
        }
    }

    /// Close the running phase (if any) and start timing `phase`
    pub fn enter(&mut self, phase: SuitePhase) {
        self.close();
        self.current = Some((phase, Instant::now()));
    }

    /// Close the running phase without starting another
    pub fn close(&mut self) {
        if let Some((phase, started)) = self.current.take() {
            self.laps.push((phase, started.elapsed()));
        }
    }

    /// Finished phases in the order they ran
    pub fn timings(&self) -> Vec<PhaseTiming> {
        self.laps
            .iter()
            .map(|(phase, d)| PhaseTiming {
                phase: *phase,
                duration_ms: d.as_millis() as u64,
            })
            .collect()
    }
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new()
    }
}
