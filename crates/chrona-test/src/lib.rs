//! Chrona Test Harness - Chaos replication and curve validation
//!
//! This crate provides:
//! - Chaos delivery channel (latency, loss, reordering, duplication)
//! - Replication simulation of an authoritative curve
//! - Concurrent render stress over shared curves
//! - Randomized curve fuzzing against a reference model

pub mod chaos;
pub mod fuzzer;
pub mod replication;
pub mod stress;

pub use chaos::*;
pub use fuzzer::*;
pub use replication::*;
pub use stress::*;
