//! Arbitrary operation sequences keep the store ordered and never panic.

#![no_main]

use arbitrary::Arbitrary;
use chrona_curve::{SteppedCurve, Time, TimeCurve};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert(i32, u8),
    Clean(i32),
    EraseFrom(i32),
    EraseAfter(i32),
    RemoveRange(i32, u16),
    Query(i32),
}

fuzz_target!(|ops: Vec<Op>| {
    let mut curve = SteppedCurve::new(0u8);
    for op in ops {
        match op {
            Op::Insert(ms, value) => {
                curve.set(Time::from_millis(ms as i64), value);
            }
            Op::Clean(ms) => {
                curve.clean(Time::from_millis(ms as i64));
            }
            Op::EraseFrom(ms) => {
                curve.store_mut().erase_from(Time::from_millis(ms as i64));
            }
            Op::EraseAfter(ms) => {
                curve.store_mut().erase_after(Time::from_millis(ms as i64));
            }
            Op::RemoveRange(ms, len) => {
                let from = Time::from_millis(ms as i64);
                let to = Time::from_millis(ms as i64 + len as i64);
                curve.store_mut().cursor_between(from, to).remove_where(|e| e.value % 3 == 0);
            }
            Op::Query(ms) => {
                let _ = curve.get(Time::from_millis(ms as i64));
            }
        }
        let times: Vec<_> = curve.iter().map(|e| e.time).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
});
