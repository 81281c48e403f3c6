//! Interpolated (continuous) curves
//!
//! The value between two keyframes is blended with [`Interpolate`]. Outside
//! the recorded range the nearest boundary value is returned unmodified.
//!
//! Among keyframes sharing a time the last inserted one anchors the
//! interpolation, and the next keyframe is the first one strictly later, so
//! the blend fraction is always well defined.

use chrona_core::{Interpolate, Time};

use crate::curve::{Curve, Sample};
use crate::store::TimeOrderedStore;

/// Linear sampling between the bracketing keyframes
#[derive(Clone, Copy, Debug, Default)]
pub struct Linear;

impl<T: Interpolate + Clone> Sample<T> for Linear {
    fn sample(store: &TimeOrderedStore<T>, default: &T, time: Time) -> T {
        let Some(index) = store.last_at_or_before(time) else {
            // Before the first keyframe, or empty
            return store
                .first()
                .map_or_else(|| default.clone(), |e| e.value.clone());
        };

        let Some(before) = store.at(index) else {
            return default.clone();
        };
        match store.at(index + 1) {
            Some(after) => {
                let fraction = time.fraction_between(before.time, after.time);
                before.value.interpolate(&after.value, fraction)
            }
            None => before.value.clone(),
        }
    }
}

/// Curve interpolating between keyframes
pub type InterpolatedCurve<T> = Curve<T, Linear>;
