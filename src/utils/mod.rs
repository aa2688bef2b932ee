//! Utility helpers
//!
//! Logging setup and timing.

pub mod logger;
pub mod timer;
