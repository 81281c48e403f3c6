//! Chrona Timeline - simulation time, rollback depth and retention horizon
//!
//! This crate owns the timeline that curves are queried against:
//! - Simulation clock: fixed-step, rewindable for corrective rollback
//! - Presentation clock: wall-clock driven, smooth, never jumps
//! - Lateness model: how far in the past corrections land
//! - Timeline engine: adaptive retention horizon and periodic pruning

pub mod clock;
pub mod engine;
pub mod lateness;

pub use clock::*;
pub use engine::*;
pub use lateness::*;
