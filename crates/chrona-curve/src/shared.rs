//! Shared single-writer / multi-reader curve handle
//!
//! The simulation thread mutates under the write lock while render and
//! network threads read under the read lock. Every structural change happens
//! entirely inside one write critical section, so readers see either the state
//! before it or the state after it.

use std::sync::Arc;

use chrona_core::Time;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::curve::Prune;

/// Cloneable handle to a curve behind a reader-writer lock
pub struct SharedCurve<C> {
    inner: Arc<RwLock<C>>,
}

impl<C> SharedCurve<C> {
    pub fn new(curve: C) -> Self {
        SharedCurve {
            inner: Arc::new(RwLock::new(curve)),
        }
    }

    /// Shared access for queries
    pub fn read(&self) -> RwLockReadGuard<'_, C> {
        self.inner.read()
    }

    /// Exclusive access for inserts, erases, pruning and sync
    pub fn write(&self) -> RwLockWriteGuard<'_, C> {
        self.inner.write()
    }

    pub fn with_read<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn with_write<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Number of handles sharing this curve
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<C> Clone for SharedCurve<C> {
    fn clone(&self) -> Self {
        SharedCurve {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Default> Default for SharedCurve<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for SharedCurve<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCurve")
            .field("curve", &*self.inner.read())
            .finish()
    }
}

impl<C: Prune> Prune for SharedCurve<C> {
    fn prune(&mut self, horizon: Time) -> usize {
        self.inner.write().prune(horizon)
    }
}
