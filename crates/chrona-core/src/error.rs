//! Error types for curve operations

use thiserror::Error;

use crate::Time;

/// Curve errors
///
/// Querying an empty curve is not an error: queries return the curve default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    // Position errors
    #[error("Stale position: taken at generation {held}, store is at generation {current}")]
    StalePosition { held: u64, current: u64 },

    #[error("Position out of range: index {index}, len {len}")]
    OutOfRange { index: usize, len: usize },

    // Ordering errors
    #[error("Unsorted input at entry {index}: {found} follows {previous}")]
    Unsorted {
        index: usize,
        previous: Time,
        found: Time,
    },

    // Codec errors
    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Invalid magic number: 0x{0:08X}")]
    InvalidMagic(u32),

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid value encoding: {0}")]
    InvalidValue(String),

    #[error("Trailing bytes after curve payload: {0}")]
    TrailingBytes(usize),

    #[error("Too many keyframes to encode: {count}, limit {max}")]
    TooManyEntries { count: usize, max: usize },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for curve operations
pub type CurveResult<T> = Result<T, CurveError>;
