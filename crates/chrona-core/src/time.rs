//! Time primitives for curves
//!
//! Curve time is a dense, totally ordered scalar counted in microseconds
//! since the simulation epoch. The two extreme values are reserved as
//! open-ended sentinels for range queries.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// Simulation time - microseconds since simulation epoch
/// INVARIANT: `NEG_INFINITY` and `INFINITY` never move under arithmetic
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(pub i64);

impl Time {
    pub const ZERO: Time = Time(0);
    /// Lower sentinel, precedes every finite time
    pub const NEG_INFINITY: Time = Time(i64::MIN);
    /// Upper sentinel, follows every finite time
    pub const INFINITY: Time = Time(i64::MAX);

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Time(micros)
    }

    /// Saturates to the largest finite times instead of reaching a sentinel
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self::finite(millis.saturating_mul(1000))
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::finite((secs * 1_000_000.0) as i64)
    }

    #[inline]
    const fn finite(micros: i64) -> Self {
        if micros == i64::MIN {
            Time(i64::MIN + 1)
        } else if micros == i64::MAX {
            Time(i64::MAX - 1)
        } else {
            Time(micros)
        }
    }

    #[inline]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// False for the two sentinels
    #[inline]
    pub const fn is_finite(self) -> bool {
        self.0 != i64::MIN && self.0 != i64::MAX
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        if !self.is_finite() {
            return self;
        }
        let micros = i64::try_from(duration.as_micros()).unwrap_or(i64::MAX);
        // Stay clear of the upper sentinel
        Time(self.0.saturating_add(micros).min(i64::MAX - 1))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        if !self.is_finite() {
            return self;
        }
        let micros = i64::try_from(duration.as_micros()).unwrap_or(i64::MAX);
        Time(self.0.saturating_sub(micros).max(i64::MIN + 1))
    }

    /// Position of `self` inside `[start, end]` as a fraction in `0.0..=1.0`.
    ///
    /// Returns `0.0` for an empty or inverted interval.
    pub fn fraction_between(self, start: Time, end: Time) -> f64 {
        if end <= start {
            return 0.0;
        }
        let span = end.0 as f64 - start.0 as f64;
        let offset = self.0 as f64 - start.0 as f64;
        (offset / span).clamp(0.0, 1.0)
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for Time {
    type Output = Time;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    /// Elapsed duration, zero when `rhs` is later
    #[inline]
    fn sub(self, rhs: Time) -> Self::Output {
        let diff = (self.0 as i128) - (rhs.0 as i128);
        if diff > 0 {
            Duration::from_micros(u64::try_from(diff).unwrap_or(u64::MAX))
        } else {
            Duration::ZERO
        }
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Time::NEG_INFINITY => write!(f, "t(-inf)"),
            Time::INFINITY => write!(f, "t(+inf)"),
            Time(micros) => write!(f, "t({:.3}ms)", micros as f64 / 1000.0),
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Explicit time context handed to pruning and synchronization.
///
/// Replaces a process-wide "current time": the owner of the timeline builds
/// one per tick and passes it down, so tests can drive arbitrary timelines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeContext {
    /// Current authoritative simulation time
    pub now: Time,
    /// Retention horizon, no query will ever target a time before it
    pub horizon: Time,
}

impl TimeContext {
    /// Build a context; the horizon is clamped so it never exceeds `now`
    pub fn new(now: Time, horizon: Time) -> Self {
        TimeContext {
            now,
            horizon: horizon.min(now),
        }
    }

    /// Context with no retention limit
    pub fn unbounded(now: Time) -> Self {
        TimeContext {
            now,
            horizon: Time::NEG_INFINITY,
        }
    }

    /// Check if a time can still be queried
    #[inline]
    pub fn contains(&self, t: Time) -> bool {
        t >= self.horizon
    }

    /// Check if a time is history (strictly before now)
    #[inline]
    pub fn is_history(&self, t: Time) -> bool {
        t < self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_order() {
        assert!(Time::NEG_INFINITY < Time::ZERO);
        assert!(Time::INFINITY > Time::from_secs_f64(1.0e9));
        assert!(!Time::INFINITY.is_finite());
        assert!(Time::from_millis(5).is_finite());
    }

    #[test]
    fn test_sentinels_absorb_arithmetic() {
        let d = Duration::from_secs(10);
        assert_eq!(Time::INFINITY - d, Time::INFINITY);
        assert_eq!(Time::NEG_INFINITY + d, Time::NEG_INFINITY);
    }

    #[test]
    fn test_conversions_saturate_below_sentinels() {
        assert_eq!(Time::from_millis(i64::MAX), Time(i64::MAX - 1));
        assert_eq!(Time::from_millis(i64::MIN), Time(i64::MIN + 1));
        assert!(Time::from_millis(i64::MAX / 999).is_finite());
        assert!(Time::from_secs_f64(f64::INFINITY) < Time::INFINITY);
        assert!(Time::from_secs_f64(f64::NEG_INFINITY) > Time::NEG_INFINITY);
        assert_eq!(Time::from_millis(-3), Time::from_micros(-3000));
    }

    #[test]
    fn test_time_difference_saturates() {
        let a = Time::from_millis(10);
        let b = Time::from_millis(25);
        assert_eq!(b - a, Duration::from_millis(15));
        assert_eq!(a - b, Duration::ZERO);
    }

    #[test]
    fn test_fraction_between() {
        let t0 = Time::from_millis(0);
        let t1 = Time::from_millis(10);
        assert_eq!(Time::from_millis(5).fraction_between(t0, t1), 0.5);
        assert_eq!(Time::from_millis(20).fraction_between(t0, t1), 1.0);
        assert_eq!(Time::from_millis(5).fraction_between(t1, t0), 0.0);
    }

    #[test]
    fn test_context_horizon_clamped() {
        let ctx = TimeContext::new(Time::from_millis(100), Time::from_millis(150));
        assert_eq!(ctx.horizon, Time::from_millis(100));
        assert!(ctx.contains(Time::from_millis(100)));
        assert!(!ctx.contains(Time::from_millis(99)));
        assert!(ctx.is_history(Time::from_millis(99)));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn add_then_sub_is_identity(base in -1_000_000_000i64..1_000_000_000, step in 0u64..1_000_000_000) {
                let t = Time::from_micros(base);
                let d = Duration::from_micros(step);
                prop_assert_eq!((t + d) - d, t);
                prop_assert_eq!((t + d) - t, d);
            }

            #[test]
            fn fraction_stays_in_unit_range(t in any::<i64>(), a in any::<i64>(), b in any::<i64>()) {
                let f = Time(t).fraction_between(Time(a), Time(b));
                prop_assert!((0.0..=1.0).contains(&f));
            }
        }
    }
}
