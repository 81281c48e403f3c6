//! Persistence through serde (requires the `serde` feature).

#![cfg(feature = "serde")]

use chrona_curve::{Keyframe, SteppedCurve, Time, TimeCurve, TimeOrderedStore};

#[test]
fn store_serializes_as_keyframe_sequence() {
    let mut curve = SteppedCurve::new(0u32);
    curve.set(Time::from_millis(20), 2);
    curve.set(Time::from_millis(10), 1);

    let json = serde_json::to_string(curve.store()).unwrap();
    let entries: Vec<Keyframe<u32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].time, Time::from_millis(10));
}

#[test]
fn deserialization_resorts_untrusted_order() {
    let json = r#"[
        {"time": 5000, "value": "late"},
        {"time": 2000, "value": "early"},
        {"time": 5000, "value": "later"}
    ]"#;
    let store: TimeOrderedStore<String> = serde_json::from_str(json).unwrap();
    let values: Vec<_> = store.iter().map(|e| e.value.as_str()).collect();
    assert_eq!(values, vec!["early", "late", "later"]);

    let curve = SteppedCurve::from_store(String::new(), store);
    assert_eq!(curve.get(Time::from_millis(6)), "later");
}
