//! Time-ordered keyframe store
//!
//! The storage primitive shared by every curve kind: a deque of keyframes kept
//! sorted by time. Entries with equal times keep their insertion order.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrona_core::{CurveError, CurveResult, Time};
use tracing::trace;

/// A single `(time, value)` entry
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe<T> {
    pub time: Time,
    pub value: T,
}

impl<T> Keyframe<T> {
    #[inline]
    pub fn new(time: Time, value: T) -> Self {
        Keyframe { time, value }
    }

    /// Split into a `(time, value)` pair
    #[inline]
    pub fn into_pair(self) -> (Time, T) {
        (self.time, self.value)
    }
}

/// Detached position of an entry, tagged with the store generation.
///
/// Every structural mutation bumps the generation, so a position taken
/// before an insert, erase, clean or clear is detected as stale instead of
/// silently pointing at a different entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl Position {
    /// Index of the entry at the time the position was taken
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Sorted keyframe storage
/// INVARIANT: entries are sorted non-decreasingly by time
pub struct TimeOrderedStore<T> {
    entries: VecDeque<Keyframe<T>>,
    /// Bumped on every structural mutation
    generation: u64,
    /// Index of the last successful point lookup; only a search shortcut
    hint: AtomicUsize,
}

impl<T> TimeOrderedStore<T> {
    pub fn new() -> Self {
        TimeOrderedStore {
            entries: VecDeque::new(),
            generation: 0,
            hint: AtomicUsize::new(0),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TimeOrderedStore {
            entries: VecDeque::with_capacity(capacity),
            generation: 0,
            hint: AtomicUsize::new(0),
        }
    }

    /// Build from entries that must already be sorted
    pub fn try_from_sorted(entries: Vec<Keyframe<T>>) -> CurveResult<Self> {
        for (index, pair) in entries.windows(2).enumerate() {
            if pair[1].time < pair[0].time {
                return Err(CurveError::Unsorted {
                    index: index + 1,
                    previous: pair[0].time,
                    found: pair[1].time,
                });
            }
        }
        Ok(TimeOrderedStore {
            entries: entries.into(),
            generation: 0,
            hint: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn first(&self) -> Option<&Keyframe<T>> {
        self.entries.front()
    }

    pub fn last(&self) -> Option<&Keyframe<T>> {
        self.entries.back()
    }

    /// Entry at a raw index
    #[inline]
    pub fn at(&self, index: usize) -> Option<&Keyframe<T>> {
        self.entries.get(index)
    }

    #[inline]
    pub(crate) fn at_mut(&mut self, index: usize) -> Option<&mut Keyframe<T>> {
        self.entries.get_mut(index)
    }

    /// Iterate over all entries in time order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Keyframe<T>> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Fresh position for a raw index
    #[inline]
    pub fn position_at(&self, index: usize) -> Position {
        Position {
            index,
            generation: self.generation,
        }
    }

    /// Insert an entry, after any existing entries with the same time.
    ///
    /// The time may precede the current latest entry; corrective inserts
    /// from late network updates land in the right place.
    pub fn insert(&mut self, time: Time, value: T) -> Position {
        let index = match self.entries.back() {
            Some(last) if last.time > time => {
                let index = self.upper_bound(time);
                trace!(?time, latest = ?last.time, index, "corrective insert");
                self.entries.insert(index, Keyframe::new(time, value));
                index
            }
            _ => {
                self.entries.push_back(Keyframe::new(time, value));
                self.entries.len() - 1
            }
        };
        self.bump();
        self.position_at(index)
    }

    /// Check that a position is current and points at an entry
    pub fn validate(&self, position: Position) -> CurveResult<()> {
        if position.generation != self.generation {
            return Err(CurveError::StalePosition {
                held: position.generation,
                current: self.generation,
            });
        }
        if position.index >= self.entries.len() {
            return Err(CurveError::OutOfRange {
                index: position.index,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    /// Resolve a position to its entry
    pub fn get(&self, position: Position) -> CurveResult<&Keyframe<T>> {
        self.validate(position)?;
        Ok(&self.entries[position.index])
    }

    /// Remove exactly one entry.
    ///
    /// Returns a fresh position for the entry that followed the removed one
    /// (equal to `len()` when the removed entry was the last).
    pub fn erase(&mut self, position: Position) -> CurveResult<Position> {
        self.validate(position)?;
        self.remove_index(position.index);
        Ok(self.position_at(position.index))
    }

    pub(crate) fn remove_index(&mut self, index: usize) -> Option<Keyframe<T>> {
        let removed = self.entries.remove(index);
        if let Some(entry) = &removed {
            trace!(time = ?entry.time, index, "erase");
            self.bump();
        }
        removed
    }

    pub(crate) fn pop_first(&mut self) -> Option<Keyframe<T>> {
        let popped = self.entries.pop_front();
        if popped.is_some() {
            self.bump();
        }
        popped
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.bump();
    }

    /// Remove every entry strictly before `time`.
    ///
    /// Scans from the front and stops at the first entry at or after `time`.
    /// Returns the number of removed entries.
    pub fn clean(&mut self, time: Time) -> usize {
        let mut removed = 0;
        while let Some(front) = self.entries.front() {
            if front.time >= time {
                break;
            }
            self.entries.pop_front();
            removed += 1;
        }
        if removed > 0 {
            self.bump();
        }
        removed
    }

    /// Remove every entry at or after `time`
    pub fn erase_from(&mut self, time: Time) -> usize {
        let keep = self.lower_bound(time);
        self.truncate(keep)
    }

    /// Remove every entry strictly after `time`
    pub fn erase_after(&mut self, time: Time) -> usize {
        let keep = self.upper_bound(time);
        self.truncate(keep)
    }

    fn truncate(&mut self, keep: usize) -> usize {
        let removed = self.entries.len() - keep;
        if removed > 0 {
            self.entries.truncate(keep);
            self.bump();
        }
        removed
    }

    /// Index of the first entry with time >= `time` (or `len()`)
    #[inline]
    pub fn lower_bound(&self, time: Time) -> usize {
        self.entries.partition_point(|e| e.time < time)
    }

    /// Index of the first entry with time > `time` (or `len()`)
    #[inline]
    pub fn upper_bound(&self, time: Time) -> usize {
        self.entries.partition_point(|e| e.time <= time)
    }

    /// Index of the latest entry with time <= `time`.
    ///
    /// Among equal times the last inserted entry is returned. Consecutive
    /// lookups at slowly increasing times resolve from the hint in O(1).
    pub fn last_at_or_before(&self, time: Time) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }

        let hint = self.hint.load(Ordering::Relaxed);
        if hint < len && self.entries[hint].time <= time {
            for candidate in hint..(hint + 2).min(len) {
                let next_is_later = self
                    .entries
                    .get(candidate + 1)
                    .map_or(true, |next| next.time > time);
                if self.entries[candidate].time <= time && next_is_later {
                    self.hint.store(candidate, Ordering::Relaxed);
                    return Some(candidate);
                }
            }
        }

        let bound = self.upper_bound(time);
        if bound == 0 {
            return None;
        }
        self.hint.store(bound - 1, Ordering::Relaxed);
        Some(bound - 1)
    }

    /// Index of the first entry with time > `time`
    pub fn first_after(&self, time: Time) -> Option<usize> {
        let index = self.upper_bound(time);
        (index < self.entries.len()).then_some(index)
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        *self.hint.get_mut() = 0;
    }
}

impl<T> Default for TimeOrderedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for TimeOrderedStore<T> {
    fn clone(&self) -> Self {
        TimeOrderedStore {
            entries: self.entries.clone(),
            generation: self.generation,
            hint: AtomicUsize::new(self.hint.load(Ordering::Relaxed)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TimeOrderedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeOrderedStore")
            .field("generation", &self.generation)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Collects in any order; a stable sort re-establishes time order
impl<T> FromIterator<Keyframe<T>> for TimeOrderedStore<T> {
    fn from_iter<I: IntoIterator<Item = Keyframe<T>>>(iter: I) -> Self {
        let mut entries: Vec<Keyframe<T>> = iter.into_iter().collect();
        entries.sort_by_key(|e| e.time);
        TimeOrderedStore {
            entries: entries.into(),
            generation: 0,
            hint: AtomicUsize::new(0),
        }
    }
}

impl<T> FromIterator<(Time, T)> for TimeOrderedStore<T> {
    fn from_iter<I: IntoIterator<Item = (Time, T)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(time, value)| Keyframe::new(time, value))
            .collect()
    }
}

impl<T> Extend<Keyframe<T>> for TimeOrderedStore<T> {
    fn extend<I: IntoIterator<Item = Keyframe<T>>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry.time, entry.value);
        }
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Keyframe, TimeOrderedStore};

    impl<T: Serialize> Serialize for TimeOrderedStore<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.entries.iter())
        }
    }

    /// Serialized order is not trusted; entries are re-sorted on load
    impl<'de, T: Deserialize<'de>> Deserialize<'de> for TimeOrderedStore<T> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let entries = Vec::<Keyframe<T>>::deserialize(deserializer)?;
            Ok(entries.into_iter().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ms: i64) -> Time {
        Time::from_millis(ms)
    }

    fn times<T>(store: &TimeOrderedStore<T>) -> Vec<i64> {
        store.iter().map(|e| e.time.as_millis()).collect()
    }

    #[test]
    fn test_out_of_order_insert() {
        let mut store = TimeOrderedStore::new();
        store.insert(t(5), "v1");
        store.insert(t(2), "v2");

        let pairs: Vec<_> = store.iter().map(|e| (e.time, e.value)).collect();
        assert_eq!(pairs, vec![(t(2), "v2"), (t(5), "v1")]);
    }

    #[test]
    fn test_equal_times_keep_insertion_order() {
        let mut store = TimeOrderedStore::new();
        store.insert(t(3), 'a');
        store.insert(t(1), 'b');
        store.insert(t(3), 'c');
        store.insert(t(3), 'd');

        let values: Vec<_> = store.iter().map(|e| e.value).collect();
        assert_eq!(values, vec!['b', 'a', 'c', 'd']);
        assert_eq!(store.last_at_or_before(t(3)), Some(3));
    }

    #[test]
    fn test_insert_returns_position_of_new_entry() {
        let mut store = TimeOrderedStore::new();
        store.insert(t(1), 10);
        store.insert(t(9), 90);
        let pos = store.insert(t(4), 40);

        assert_eq!(pos.index(), 1);
        assert_eq!(store.get(pos).unwrap().value, 40);
    }

    #[test]
    fn test_clean_removes_strictly_earlier() {
        let mut store: TimeOrderedStore<i32> = (1..=5).map(|i| (t(i), i as i32)).collect();

        assert_eq!(store.clean(t(3)), 2);
        assert_eq!(times(&store), vec![3, 4, 5]);

        let generation = store.generation();
        assert_eq!(store.clean(t(3)), 0);
        assert_eq!(times(&store), vec![3, 4, 5]);
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn test_erase_returns_following_position() {
        let mut store: TimeOrderedStore<i32> = (1..=4).map(|i| (t(i), i as i32)).collect();
        let pos = store.position_at(1);

        let next = store.erase(pos).unwrap();
        assert_eq!(store.get(next).unwrap().value, 3);
        assert_eq!(times(&store), vec![1, 3, 4]);
    }

    #[test]
    fn test_stale_position_detected() {
        let mut store = TimeOrderedStore::new();
        let pos = store.insert(t(1), 1);
        store.insert(t(2), 2);

        assert!(matches!(
            store.get(pos),
            Err(CurveError::StalePosition { .. })
        ));
        assert!(matches!(
            store.erase(pos),
            Err(CurveError::StalePosition { .. })
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_position_out_of_range() {
        let mut store = TimeOrderedStore::new();
        store.insert(t(1), 1);
        let end = store.position_at(1);
        assert_eq!(
            store.erase(end),
            Err(CurveError::OutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_clear_invalidates_positions() {
        let mut store = TimeOrderedStore::new();
        let pos = store.insert(t(1), 1);
        store.clear();
        assert!(store.is_empty());
        assert!(store.get(pos).is_err());
    }

    #[test]
    fn test_erase_from_and_after() {
        let mut store: TimeOrderedStore<i32> =
            [1, 2, 2, 3, 4].iter().map(|&i| (t(i), i as i32)).collect();

        let mut a = store.clone();
        assert_eq!(a.erase_from(t(2)), 4);
        assert_eq!(times(&a), vec![1]);

        assert_eq!(store.erase_after(t(2)), 2);
        assert_eq!(times(&store), vec![1, 2, 2]);
    }

    #[test]
    fn test_last_at_or_before_with_hint() {
        let store: TimeOrderedStore<i32> = (0..10).map(|i| (t(i * 10), i as i32)).collect();

        assert_eq!(store.last_at_or_before(t(-1)), None);
        // Walk forward so the hint path is taken
        for ms in 0..100 {
            let index = store.last_at_or_before(t(ms)).unwrap();
            assert_eq!(index, (ms / 10) as usize);
        }
        // Jump backwards past the hint
        assert_eq!(store.last_at_or_before(t(15)), Some(1));
        assert_eq!(store.first_after(t(90)), None);
        assert_eq!(store.first_after(t(85)), Some(9));
    }

    #[test]
    fn test_try_from_sorted_rejects_unsorted() {
        let entries = vec![
            Keyframe::new(t(1), 1),
            Keyframe::new(t(3), 3),
            Keyframe::new(t(2), 2),
        ];
        assert_eq!(
            TimeOrderedStore::try_from_sorted(entries).unwrap_err(),
            CurveError::Unsorted {
                index: 2,
                previous: t(3),
                found: t(2),
            }
        );
    }

    #[test]
    fn test_collect_resorts_stably() {
        let store: TimeOrderedStore<char> =
            vec![(t(2), 'x'), (t(1), 'y'), (t(2), 'z')].into_iter().collect();
        let values: Vec<_> = store.iter().map(|e| e.value).collect();
        assert_eq!(values, vec!['y', 'x', 'z']);
    }
}
