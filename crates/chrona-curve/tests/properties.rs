//! Property-based tests for the curve family.
//!
//! Random insert sequences are checked against a sorted reference model.

use chrona_curve::codec::{decode_store, encode_store, DecodeOrder};
use chrona_curve::{InterpolatedCurve, SteppedCurve, Time, TimeCurve, TimeOrderedStore};
use proptest::prelude::*;

fn t(ms: i64) -> Time {
    Time::from_millis(ms)
}

fn arb_inserts(max: usize) -> impl Strategy<Value = Vec<(i64, i32)>> {
    proptest::collection::vec((-50i64..50, any::<i32>()), 0..=max)
}

/// Reference: stable sort by time keeps insertion order among ties
fn reference(inserts: &[(i64, i32)]) -> Vec<(i64, i32)> {
    let mut sorted = inserts.to_vec();
    sorted.sort_by_key(|&(ms, _)| ms);
    sorted
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any insert order yields a non-decreasing traversal
    #[test]
    fn ordering_invariant(inserts in arb_inserts(64)) {
        let mut store = TimeOrderedStore::new();
        for &(ms, v) in &inserts {
            store.insert(t(ms), v);
        }
        let traversal: Vec<_> = store.iter().map(|e| (e.time.as_millis(), e.value)).collect();
        prop_assert_eq!(traversal, reference(&inserts));
    }

    /// Step query returns the last-inserted value among the latest time <= query
    #[test]
    fn stepped_matches_reference(inserts in arb_inserts(32), query in -60i64..60) {
        let mut curve = SteppedCurve::new(i32::MIN);
        for &(ms, v) in &inserts {
            curve.set(t(ms), v);
        }
        let expected = reference(&inserts)
            .into_iter()
            .filter(|&(ms, _)| ms <= query)
            .last()
            .map_or(i32::MIN, |(_, v)| v);
        prop_assert_eq!(curve.get(t(query)), expected);
    }

    /// Cleaning keeps exactly the entries at or after the horizon, idempotently
    #[test]
    fn clean_is_safe_and_idempotent(inserts in arb_inserts(48), horizon in -60i64..60) {
        let mut curve = SteppedCurve::new(0);
        for &(ms, v) in &inserts {
            curve.set(t(ms), v);
        }
        let before: Vec<_> = (horizon..60).map(|ms| curve.get(t(ms))).collect();

        curve.clean(t(horizon));
        let once: Vec<_> = curve.iter().cloned().collect();
        curve.clean(t(horizon));
        let twice: Vec<_> = curve.iter().cloned().collect();

        prop_assert_eq!(&once, &twice);
        prop_assert!(once.iter().all(|e| e.time >= t(horizon)));
        let expected_len = inserts.iter().filter(|&&(ms, _)| ms >= horizon).count();
        prop_assert_eq!(once.len(), expected_len);

        // Queries at or after the horizon are unaffected unless they relied on
        // the value carried in from before it
        let first_kept = once.first().map(|e| e.time);
        for (offset, value) in before.into_iter().enumerate() {
            let ms = horizon + offset as i64;
            if first_kept.map_or(false, |first| t(ms) >= first) {
                prop_assert_eq!(curve.get(t(ms)), value);
            }
        }
    }

    /// Range iteration visits exactly the entries in `[from, to)`
    #[test]
    fn between_is_half_open(inserts in arb_inserts(48), from in -60i64..60, len in 0i64..40) {
        let to = from + len;
        let mut store = TimeOrderedStore::new();
        for &(ms, v) in &inserts {
            store.insert(t(ms), v);
        }
        let visited: Vec<_> = store
            .between(t(from), t(to))
            .map(|e| (e.time.as_millis(), e.value))
            .collect();
        let expected: Vec<_> = reference(&inserts)
            .into_iter()
            .filter(|&(ms, _)| ms >= from && ms < to)
            .collect();
        prop_assert_eq!(visited, expected);
    }

    /// Interpolated values stay within the bracketing keyframe values
    #[test]
    fn interpolation_is_bounded(
        keys in proptest::collection::vec((0i64..1000, -1000.0f64..1000.0), 1..16),
        query in -100i64..1100,
    ) {
        let mut curve = InterpolatedCurve::new(0.0f64);
        for &(ms, v) in &keys {
            curve.set(t(ms), v);
        }
        let value = curve.get(t(query));
        let here = curve.frame(t(query));
        match curve.next_frame(t(query)) {
            Some(next) if here.time.is_finite() => {
                let lo = here.value.min(next.value) - 1e-9;
                let hi = here.value.max(next.value) + 1e-9;
                prop_assert!(value >= lo && value <= hi);
            }
            Some(next) => prop_assert_eq!(value, next.value),
            None => prop_assert_eq!(value, here.value),
        }
    }

    /// Strict decode accepts what encode produced; resort accepts anything
    #[test]
    fn codec_preserves_order(inserts in arb_inserts(32)) {
        let mut store = TimeOrderedStore::new();
        for &(ms, v) in &inserts {
            store.insert(t(ms), v);
        }
        let bytes = encode_store(&store).unwrap();
        let strict = decode_store::<i32>(&bytes, DecodeOrder::Strict).unwrap();
        let resorted = decode_store::<i32>(&bytes, DecodeOrder::Resort).unwrap();
        let a: Vec<_> = strict.iter().cloned().collect();
        let b: Vec<_> = resorted.iter().cloned().collect();
        let expected: Vec<_> = store.iter().cloned().collect();
        prop_assert_eq!(&a, &expected);
        prop_assert_eq!(&b, &expected);
    }
}

#[test]
fn out_of_order_insert_traversal() {
    let mut store = TimeOrderedStore::new();
    store.insert(t(5), "v1");
    store.insert(t(2), "v2");
    let traversal: Vec<_> = store.iter().map(|e| (e.time, e.value)).collect();
    assert_eq!(traversal, vec![(t(2), "v2"), (t(5), "v1")]);
}

#[test]
fn stepped_round_trip_until_next_entry() {
    let mut curve = SteppedCurve::new(0);
    curve.set(t(10), 42);
    for ms in 10..100 {
        assert_eq!(curve.get(t(ms)), 42);
    }
    curve.set(t(100), 7);
    assert_eq!(curve.get(t(99)), 42);
    assert_eq!(curve.get(t(100)), 7);
    assert_eq!(curve.len(), 2);
}
