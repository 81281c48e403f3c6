//! Curve synchronization against an authoritative producer
//!
//! History is immutable once observed: keyframes before the current
//! simulation time are never rewritten. Keyframes at or after it are
//! provisional (predicted) and are replaced by the producer's values on every
//! sync.

use chrona_core::{Time, TimeContext};
use tracing::debug;

use crate::curve::{Curve, Sample, TimeCurve};
use crate::shared::SharedCurve;
use crate::store::Keyframe;

/// Source of authoritative values
pub trait Producer<T> {
    /// Authoritative value at `time`, `None` if the producer knows nothing yet
    fn value_at(&self, time: Time) -> Option<T>;

    /// Authoritative keyframes strictly after `time`, ascending
    fn keyframes_after(&self, _time: Time) -> Vec<Keyframe<T>> {
        Vec::new()
    }
}

impl<T, F> Producer<T> for F
where
    F: Fn(Time) -> Option<T>,
{
    fn value_at(&self, time: Time) -> Option<T> {
        self(time)
    }
}

impl<T: Clone, M: Sample<T>> Producer<T> for Curve<T, M> {
    fn value_at(&self, time: Time) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(self.get(time))
    }

    fn keyframes_after(&self, time: Time) -> Vec<Keyframe<T>> {
        self.store()
            .begin(time)
            .filter(|e| e.time > time)
            .cloned()
            .collect()
    }
}

/// Reads under the shared lock. Never sync a shared curve from itself.
impl<T, C: Producer<T>> Producer<T> for SharedCurve<C> {
    fn value_at(&self, time: Time) -> Option<T> {
        self.read().value_at(time)
    }

    fn keyframes_after(&self, time: Time) -> Vec<Keyframe<T>> {
        self.read().keyframes_after(time)
    }
}

/// Outcome of one sync
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Provisional keyframes dropped
    pub removed: usize,
    /// Authoritative keyframes inserted
    pub inserted: usize,
    /// History keyframes left untouched
    pub preserved: usize,
}

/// Reconciles curve tails with a producer at a fixed point in time
#[derive(Clone, Copy, Debug)]
pub struct Synchronizer {
    context: TimeContext,
}

impl Synchronizer {
    pub fn new(context: TimeContext) -> Self {
        Synchronizer { context }
    }

    pub fn context(&self) -> TimeContext {
        self.context
    }

    /// Replace everything at or after `now` with the producer's values
    pub fn sync<C, P>(&self, curve: &mut C, producer: &P) -> SyncReport
    where
        C: TimeCurve,
        P: Producer<C::Value>,
    {
        self.sync_from(curve, producer, self.context.now, |value| value)
    }

    /// Like [`sync`](Self::sync), converting producer values on the way in
    pub fn sync_with<C, S, P, F>(&self, curve: &mut C, producer: &P, convert: F) -> SyncReport
    where
        C: TimeCurve,
        P: Producer<S>,
        F: Fn(S) -> C::Value,
    {
        self.sync_from(curve, producer, self.context.now, convert)
    }

    /// Mirror the producer from `start` onwards.
    ///
    /// `start` is clamped to the current time so history stays intact.
    pub fn sync_from<C, S, P, F>(
        &self,
        curve: &mut C,
        producer: &P,
        start: Time,
        convert: F,
    ) -> SyncReport
    where
        C: TimeCurve,
        P: Producer<S>,
        F: Fn(S) -> C::Value,
    {
        let start = start.max(self.context.now);
        let store = curve.store_mut();

        let removed = store.erase_from(start);
        let preserved = store.len();
        let mut inserted = 0;

        if let Some(value) = producer.value_at(start) {
            store.insert(start, convert(value));
            inserted += 1;
        }
        for keyframe in producer.keyframes_after(start) {
            if keyframe.time <= start {
                continue;
            }
            store.insert(keyframe.time, convert(keyframe.value));
            inserted += 1;
        }

        debug!(?start, removed, inserted, preserved, "curve synced");
        SyncReport {
            removed,
            inserted,
            preserved,
        }
    }
}
