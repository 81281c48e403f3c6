//! Stepped (discrete) curves
//!
//! The value holds until the next keyframe supersedes it. Used for on/off
//! flags and other piecewise-constant attributes.

use chrona_core::Time;

use crate::curve::{Curve, Sample};
use crate::store::TimeOrderedStore;

/// Step sampling: value of the latest keyframe at or before the query time
#[derive(Clone, Copy, Debug, Default)]
pub struct Step;

impl<T: Clone> Sample<T> for Step {
    fn sample(store: &TimeOrderedStore<T>, default: &T, time: Time) -> T {
        store
            .last_at_or_before(time)
            .and_then(|index| store.at(index))
            .map_or_else(|| default.clone(), |e| e.value.clone())
    }
}

/// Piecewise-constant curve
pub type SteppedCurve<T> = Curve<T, Step>;
