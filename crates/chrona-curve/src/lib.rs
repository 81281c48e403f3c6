//! Chrona Curves - Time-indexed containers for simulation state
//!
//! This crate implements the curve family:
//! - Time-ordered keyframe store with generation-tagged positions
//! - Range iteration over `[from, to)` windows, with erase-in-place
//! - Event queue for one-shot occurrences
//! - Stepped and interpolated curves sharing one store
//! - Synchronization against authoritative producers
//! - Shared single-writer / multi-reader handle
//! - Byte codec for transmitting keyframes

pub mod codec;
pub mod continuous;
pub mod curve;
pub mod discrete;
pub mod iter;
pub mod queue;
pub mod shared;
pub mod store;
pub mod sync;

pub use continuous::*;
pub use curve::*;
pub use discrete::*;
pub use iter::*;
pub use queue::*;
pub use shared::*;
pub use store::*;
pub use sync::*;

pub use chrona_core::{CurveError, CurveResult, Interpolate, Time, TimeContext};
