//! Chrona Core - Fundamental types for time curves
//!
//! This crate defines the primitives shared by every curve crate:
//! - Time scalar with open-ended sentinels
//! - Explicit time context (current time and retention horizon)
//! - Interpolation capability
//! - Error taxonomy

pub mod error;
pub mod interpolate;
pub mod time;

pub use error::*;
pub use interpolate::*;
pub use time::*;
