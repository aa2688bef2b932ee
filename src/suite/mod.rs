//! Suite orchestration
//!
//! Owns the run lifecycle: environment setup and teardown around the
//! registered specs, then report emission.

pub(crate) mod context;
mod environment;
mod runner;
mod spec;

pub use context::SuiteContext;
pub use runner::SuiteRunner;
pub use spec::Spec;
