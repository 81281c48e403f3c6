//! Event queue on a timeline
//!
//! Every event has exactly one time at which it happens. The scheduler pops
//! due events in time order; late-arriving events slot in where they belong.

use std::fmt;

use chrona_core::{CurveResult, Time};
use tracing::debug;

use crate::curve::{Prune, TimeCurve};
use crate::iter::{RangeCursorMut, RangeIter};
use crate::store::{Keyframe, Position, TimeOrderedStore};

/// Time-ordered queue of one-shot events
pub struct EventQueue<T> {
    store: TimeOrderedStore<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        EventQueue {
            store: TimeOrderedStore::new(),
        }
    }

    /// Schedule an event; returns its position
    pub fn insert(&mut self, time: Time, event: T) -> Position {
        self.store.insert(time, event)
    }

    /// Earliest event at or after `time`
    pub fn front(&self, time: Time) -> Option<&Keyframe<T>> {
        self.store.at(self.store.lower_bound(time))
    }

    /// Remove and return the earliest event
    pub fn pop_front(&mut self) -> Option<Keyframe<T>> {
        self.store.pop_first()
    }

    /// Remove and return the earliest event if it is due at `now`
    pub fn pop_due(&mut self, now: Time) -> Option<Keyframe<T>> {
        match self.store.first() {
            Some(first) if first.time <= now => self.store.pop_first(),
            _ => None,
        }
    }

    /// Remove every event due at `now`, in time order
    pub fn drain_due(&mut self, now: Time) -> Vec<Keyframe<T>> {
        let mut due = Vec::new();
        while let Some(event) = self.pop_due(now) {
            due.push(event);
        }
        due
    }

    pub fn begin(&self, from: Time) -> RangeIter<'_, T> {
        self.store.begin(from)
    }

    pub fn end(&self, to: Time) -> RangeIter<'_, T> {
        self.store.end(to)
    }

    pub fn between(&self, from: Time, to: Time) -> RangeIter<'_, T> {
        self.store.between(from, to)
    }

    pub fn cursor_between(&mut self, from: Time, to: Time) -> RangeCursorMut<'_, T> {
        self.store.cursor_between(from, to)
    }

    /// Remove one event; returns the position of the event that followed it
    pub fn erase(&mut self, position: Position) -> CurveResult<Position> {
        self.store.erase(position)
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Keyframe<T>> + ExactSizeIterator {
        self.store.iter()
    }
}

impl<T: fmt::Debug> EventQueue<T> {
    /// Log every queued event
    pub fn dump(&self) {
        for entry in self.store.iter() {
            debug!(time = ?entry.time, event = ?entry.value, "queued event");
        }
    }
}

impl<T> TimeCurve for EventQueue<T> {
    type Value = T;

    fn store(&self) -> &TimeOrderedStore<T> {
        &self.store
    }

    fn store_mut(&mut self) -> &mut TimeOrderedStore<T> {
        &mut self.store
    }
}

impl<T> Prune for EventQueue<T> {
    fn prune(&mut self, horizon: Time) -> usize {
        self.store.clean(horizon)
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for EventQueue<T> {
    fn clone(&self) -> Self {
        EventQueue {
            store: self.store.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for EventQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("store", &self.store)
            .finish()
    }
}
