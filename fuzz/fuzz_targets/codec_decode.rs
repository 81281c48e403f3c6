//! Untrusted bytes must never panic the decoder, and whatever it accepts
//! must be time-ordered.

#![no_main]

use chrona_curve::codec::{decode_store, encode_store, DecodeOrder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for order in [DecodeOrder::Strict, DecodeOrder::Resort] {
        if let Ok(store) = decode_store::<i64>(data, order) {
            let mut previous = None;
            for entry in store.iter() {
                if let Some(previous) = previous {
                    assert!(entry.time >= previous);
                }
                previous = Some(entry.time);
            }
            // Re-encoding accepted input is lossless
            let bytes = encode_store(&store).expect("count fits");
            let again =
                decode_store::<i64>(&bytes, DecodeOrder::Strict).expect("re-encoded store decodes");
            assert_eq!(again.len(), store.len());
        }
    }
});
