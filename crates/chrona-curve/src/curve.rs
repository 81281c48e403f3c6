//! Keyframe curves
//!
//! A curve is a [`TimeOrderedStore`] plus a default value and a sampling
//! mode. The mode decides how the value between keyframes is derived:
//! - [`Step`](crate::Step): latest keyframe at or before the query time
//! - [`Linear`](crate::Linear): interpolation between the bracketing keyframes
//!
//! Both modes share every storage, iteration and editing operation below.

use std::fmt;
use std::marker::PhantomData;

use chrona_core::Time;

use crate::iter::RangeIter;
use crate::store::{Keyframe, Position, TimeOrderedStore};

/// Sampling mode of a curve
pub trait Sample<T> {
    /// Value of the curve at `time`; `default` answers queries on an empty curve
    fn sample(store: &TimeOrderedStore<T>, default: &T, time: Time) -> T;
}

/// Access shared by every time-indexed container
pub trait TimeCurve {
    type Value;

    fn store(&self) -> &TimeOrderedStore<Self::Value>;

    fn store_mut(&mut self) -> &mut TimeOrderedStore<Self::Value>;

    /// Remove every entry strictly before `time`
    fn clean(&mut self, time: Time) -> usize {
        self.store_mut().clean(time)
    }

    fn len(&self) -> usize {
        self.store().len()
    }

    fn is_empty(&self) -> bool {
        self.store().is_empty()
    }
}

/// Object-safe pruning hook used by maintenance passes
pub trait Prune {
    /// Drop history strictly before the retention horizon
    fn prune(&mut self, horizon: Time) -> usize;
}

impl<T> Prune for TimeOrderedStore<T> {
    fn prune(&mut self, horizon: Time) -> usize {
        self.clean(horizon)
    }
}

/// Keyframe curve with sampling mode `M`
pub struct Curve<T, M> {
    store: TimeOrderedStore<T>,
    default: T,
    mode: PhantomData<fn() -> M>,
}

impl<T, M: Sample<T>> Curve<T, M> {
    /// Empty curve answering `default` until the first keyframe
    pub fn new(default: T) -> Self {
        Curve {
            store: TimeOrderedStore::new(),
            default,
            mode: PhantomData,
        }
    }

    /// Curve over existing keyframes
    pub fn from_store(default: T, store: TimeOrderedStore<T>) -> Self {
        Curve {
            store,
            default,
            mode: PhantomData,
        }
    }

    /// Value at `time`
    #[inline]
    pub fn get(&self, time: Time) -> T {
        M::sample(&self.store, &self.default, time)
    }
}

impl<T, M> Curve<T, M> {
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Insert a keyframe; redundant values are tolerated
    pub fn set(&mut self, time: Time, value: T) -> Position {
        self.store.insert(time, value)
    }

    /// Insert a keyframe and drop every keyframe after it
    pub fn set_last(&mut self, time: Time, value: T) -> Position {
        self.store.erase_after(time);
        self.store.insert(time, value)
    }

    /// Replace the value of the keyframe at exactly `time`, or insert one
    pub fn set_replace(&mut self, time: Time, value: T) -> Position {
        if let Some(index) = self.store.last_at_or_before(time) {
            if let Some(entry) = self.store.at_mut(index) {
                if entry.time == time {
                    entry.value = value;
                    return self.store.position_at(index);
                }
            }
        }
        self.store.insert(time, value)
    }

    /// Keyframe at or before `time`, if any
    pub fn frame_ref(&self, time: Time) -> Option<&Keyframe<T>> {
        self.store
            .last_at_or_before(time)
            .and_then(|index| self.store.at(index))
    }

    /// First keyframe strictly after `time`, if any
    pub fn next_frame_ref(&self, time: Time) -> Option<&Keyframe<T>> {
        self.store
            .first_after(time)
            .and_then(|index| self.store.at(index))
    }

    pub fn begin(&self, from: Time) -> RangeIter<'_, T> {
        self.store.begin(from)
    }

    pub fn between(&self, from: Time, to: Time) -> RangeIter<'_, T> {
        self.store.between(from, to)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Keyframe<T>> + ExactSizeIterator {
        self.store.iter()
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }
}

impl<T: Clone, M> Curve<T, M> {
    /// Keyframe at or before `time`.
    ///
    /// Before the first keyframe this is the default value at `NEG_INFINITY`.
    pub fn frame(&self, time: Time) -> Keyframe<T> {
        self.frame_ref(time)
            .cloned()
            .unwrap_or_else(|| Keyframe::new(Time::NEG_INFINITY, self.default.clone()))
    }

    /// First keyframe strictly after `time`
    pub fn next_frame(&self, time: Time) -> Option<Keyframe<T>> {
        self.next_frame_ref(time).cloned()
    }
}

impl<T: Clone + PartialEq, M: Sample<T>> Curve<T, M> {
    /// Insert only if the value at `time` differs; returns whether it did
    pub fn set_if_changed(&mut self, time: Time, value: T) -> bool {
        if self.get(time) == value {
            return false;
        }
        self.store.insert(time, value);
        true
    }
}

impl<T, M> TimeCurve for Curve<T, M> {
    type Value = T;

    fn store(&self) -> &TimeOrderedStore<T> {
        &self.store
    }

    fn store_mut(&mut self) -> &mut TimeOrderedStore<T> {
        &mut self.store
    }
}

impl<T, M> Prune for Curve<T, M> {
    fn prune(&mut self, horizon: Time) -> usize {
        self.store.clean(horizon)
    }
}

impl<T: Clone, M> Clone for Curve<T, M> {
    fn clone(&self) -> Self {
        Curve {
            store: self.store.clone(),
            default: self.default.clone(),
            mode: PhantomData,
        }
    }
}

impl<T: Default, M: Sample<T>> Default for Curve<T, M> {
    fn default() -> Self {
        Curve::new(T::default())
    }
}

impl<T: fmt::Debug, M> fmt::Debug for Curve<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Curve")
            .field("mode", &std::any::type_name::<M>())
            .field("default", &self.default)
            .field("store", &self.store)
            .finish()
    }
}
