//! Range iteration over a store
//!
//! A range iterator walks the entries whose time lies in `[from, to)`. Once it
//! passes the upper bound it stays at the end; it never wraps around.
//!
//! [`RangeIter`] borrows the store immutably and is used for read traversal.
//! [`RangeCursorMut`] borrows it mutably and supports erase-in-place; after
//! removing the current entry the cursor is rebased on the following one.

use chrona_core::Time;

use crate::store::{Keyframe, Position, TimeOrderedStore};

/// Read-only cursor over `[from, to)`
pub struct RangeIter<'a, T> {
    store: &'a TimeOrderedStore<T>,
    index: usize,
    from: Time,
    to: Time,
}

impl<'a, T> RangeIter<'a, T> {
    fn settle(mut self) -> Self {
        self.index = settle(self.store, self.index, self.from, self.to);
        self
    }

    /// Lower bound of the window
    #[inline]
    pub fn from(&self) -> Time {
        self.from
    }

    /// Upper (exclusive) bound of the window
    #[inline]
    pub fn to(&self) -> Time {
        self.to
    }

    /// Check if the cursor points at an entry inside the window
    pub fn valid(&self) -> bool {
        self.store
            .at(self.index)
            .map_or(false, |e| e.time >= self.from && e.time < self.to)
    }

    /// Check if the cursor reached the end state
    #[inline]
    pub fn is_end(&self) -> bool {
        !self.valid()
    }

    /// Current entry, `None` at the end
    pub fn get(&self) -> Option<&'a Keyframe<T>> {
        if !self.valid() {
            return None;
        }
        self.store.at(self.index)
    }

    /// Current value, `None` at the end
    pub fn value(&self) -> Option<&'a T> {
        self.get().map(|e| &e.value)
    }

    /// Detached position of the current entry, usable with `erase`
    pub fn position(&self) -> Option<Position> {
        self.valid().then(|| self.store.position_at(self.index))
    }

    /// Move to the next entry in the window; idempotent at the end
    pub fn advance(&mut self) {
        if self.valid() {
            self.index = settle(self.store, self.index + 1, self.from, self.to);
        }
    }
}

impl<T> Clone for RangeIter<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RangeIter<'_, T> {}

impl<'a, T> Iterator for RangeIter<'a, T> {
    type Item = &'a Keyframe<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.get()?;
        self.advance();
        Some(current)
    }
}

impl<T> std::fmt::Debug for RangeIter<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeIter")
            .field("index", &self.index)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("valid", &self.valid())
            .finish()
    }
}

/// Mutable cursor over `[from, to)` supporting erase-in-place
pub struct RangeCursorMut<'a, T> {
    store: &'a mut TimeOrderedStore<T>,
    index: usize,
    from: Time,
    to: Time,
}

impl<'a, T> RangeCursorMut<'a, T> {
    pub fn valid(&self) -> bool {
        self.store
            .at(self.index)
            .map_or(false, |e| e.time >= self.from && e.time < self.to)
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        !self.valid()
    }

    pub fn current(&self) -> Option<&Keyframe<T>> {
        if !self.valid() {
            return None;
        }
        self.store.at(self.index)
    }

    /// Mutable access to the current value; times cannot be changed in place
    pub fn current_value_mut(&mut self) -> Option<&mut T> {
        if !self.valid() {
            return None;
        }
        self.store.at_mut(self.index).map(|e| &mut e.value)
    }

    pub fn move_next(&mut self) {
        if self.valid() {
            self.index = settle(self.store, self.index + 1, self.from, self.to);
        }
    }

    /// Remove the current entry and rebase on the one that followed it
    pub fn remove_current(&mut self) -> Option<Keyframe<T>> {
        if !self.valid() {
            return None;
        }
        let removed = self.store.remove_index(self.index);
        self.index = settle(self.store, self.index, self.from, self.to);
        removed
    }

    /// Remove every remaining entry in the window matching `predicate`
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Keyframe<T>) -> bool,
    {
        let mut removed = 0;
        while let Some(entry) = self.current() {
            if predicate(entry) {
                self.remove_current();
                removed += 1;
            } else {
                self.move_next();
            }
        }
        removed
    }
}

/// First index at or after `index` that lies in the window, or `len()`
fn settle<T>(store: &TimeOrderedStore<T>, index: usize, from: Time, to: Time) -> usize {
    let mut index = index.max(store.lower_bound(from));
    while let Some(entry) = store.at(index) {
        if entry.time >= to {
            return store.len();
        }
        if entry.time >= from {
            return index;
        }
        index += 1;
    }
    store.len()
}

impl<T> TimeOrderedStore<T> {
    /// Iterate from the first entry at or after `from`, unbounded above
    pub fn begin(&self, from: Time) -> RangeIter<'_, T> {
        RangeIter {
            store: self,
            index: self.lower_bound(from),
            from,
            to: Time::INFINITY,
        }
        .settle()
    }

    /// End state for an upper bound
    pub fn end(&self, to: Time) -> RangeIter<'_, T> {
        RangeIter {
            store: self,
            index: self.len(),
            from: Time::NEG_INFINITY,
            to,
        }
    }

    /// Iterate the entries in `[from, to)`
    pub fn between(&self, from: Time, to: Time) -> RangeIter<'_, T> {
        RangeIter {
            store: self,
            index: self.lower_bound(from),
            from,
            to,
        }
        .settle()
    }

    /// Iterate `[from, to)` starting at a known position.
    ///
    /// A stale position yields the end state.
    pub fn range_from(&self, position: Position, from: Time, to: Time) -> RangeIter<'_, T> {
        let index = if self.validate(position).is_ok() {
            position.index
        } else {
            self.len()
        };
        RangeIter {
            store: self,
            index,
            from,
            to,
        }
        .settle()
    }

    /// Mutable cursor over `[from, to)`
    pub fn cursor_between(&mut self, from: Time, to: Time) -> RangeCursorMut<'_, T> {
        let index = settle(self, self.lower_bound(from), from, to);
        RangeCursorMut {
            store: self,
            index,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ms: i64) -> Time {
        Time::from_millis(ms)
    }

    fn store_1_to_5() -> TimeOrderedStore<i32> {
        (1..=5).map(|i| (t(i), i as i32)).collect()
    }

    #[test]
    fn test_between_is_half_open() {
        let store = store_1_to_5();
        let visited: Vec<_> = store.between(t(2), t(4)).map(|e| e.value).collect();
        assert_eq!(visited, vec![2, 3]);
    }

    #[test]
    fn test_begin_and_end() {
        let store = store_1_to_5();
        let it = store.begin(t(4));
        assert_eq!(it.value(), Some(&4));
        assert_eq!(it.count(), 2);

        let past = store.begin(t(6));
        assert!(past.is_end());
        assert!(store.end(t(10)).is_end());
    }

    #[test]
    fn test_empty_store_is_end() {
        let store: TimeOrderedStore<i32> = TimeOrderedStore::new();
        assert!(store.between(Time::NEG_INFINITY, Time::INFINITY).is_end());
        assert!(store.begin(Time::NEG_INFINITY).get().is_none());
    }

    #[test]
    fn test_fully_filtered_window() {
        let store = store_1_to_5();
        assert!(store.between(t(10), t(20)).is_end());
        assert!(store.between(t(3), t(3)).is_end());
        assert!(store.between(t(4), t(2)).is_end());
    }

    #[test]
    fn test_advance_is_idempotent_at_end() {
        let store = store_1_to_5();
        let mut it = store.between(t(5), t(6));
        assert_eq!(it.value(), Some(&5));
        it.advance();
        assert!(it.is_end());
        it.advance();
        it.advance();
        assert!(it.is_end());
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_position_round_trip_through_erase() {
        let mut store = store_1_to_5();
        let pos = store.between(t(3), t(5)).position().unwrap();
        let next = store.erase(pos).unwrap();

        let rest: Vec<_> = store
            .range_from(next, Time::NEG_INFINITY, Time::INFINITY)
            .map(|e| e.value)
            .collect();
        assert_eq!(rest, vec![4, 5]);
    }

    #[test]
    fn test_range_from_stale_position_is_end() {
        let mut store = store_1_to_5();
        let pos = store.position_at(0);
        store.insert(t(0), 0);
        assert!(store.range_from(pos, Time::NEG_INFINITY, Time::INFINITY).is_end());
    }

    #[test]
    fn test_cursor_remove_in_place() {
        let mut store = store_1_to_5();
        {
            let mut cursor = store.cursor_between(t(2), t(5));
            assert_eq!(cursor.remove_current().map(|e| e.value), Some(2));
            assert_eq!(cursor.current().map(|e| e.value), Some(3));
            cursor.move_next();
            if let Some(v) = cursor.current_value_mut() {
                *v *= 10;
            }
            cursor.move_next();
            assert!(cursor.is_end());
            assert!(cursor.remove_current().is_none());
        }
        let values: Vec<_> = store.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![1, 3, 40, 5]);
    }

    #[test]
    fn test_cursor_remove_where() {
        let mut store = store_1_to_5();
        let removed = store
            .cursor_between(Time::NEG_INFINITY, Time::INFINITY)
            .remove_where(|e| e.value % 2 == 0);
        assert_eq!(removed, 2);
        let values: Vec<_> = store.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![1, 3, 5]);
    }
}
