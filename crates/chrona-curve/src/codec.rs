//! Byte codec for curve keyframes
//!
//! Layout (all little-endian):
//! - Bytes 0-3: Magic
//! - Byte 4: Format version
//! - Bytes 5-8: Keyframe count
//! - Per keyframe: time (i64 microseconds) followed by the encoded value
//!
//! Serialized order is not trusted. Decoding either rejects out-of-order
//! keyframes or re-sorts them, depending on [`DecodeOrder`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrona_core::{CurveError, CurveResult, Time};
use tracing::warn;

use crate::curve::{Curve, Sample, TimeCurve};
use crate::store::{Keyframe, TimeOrderedStore};

/// Magic number identifying an encoded curve
pub const CURVE_MAGIC: u32 = 0xC4_0E_C0_DE;

/// Current format version
pub const CODEC_VERSION: u8 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 9;

/// Per-keyframe time field size
const TIME_SIZE: usize = 8;

/// How to treat keyframes that arrive out of order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodeOrder {
    /// Fail with `CurveError::Unsorted`
    #[default]
    Strict,
    /// Stable-sort the decoded keyframes
    Resort,
}

/// A value with a fixed-width wire encoding
pub trait WireValue: Sized {
    /// Encoded size in bytes
    const WIRE_SIZE: usize;

    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Decode from a buffer holding at least `WIRE_SIZE` bytes
    fn decode<B: Buf>(buf: &mut B) -> CurveResult<Self>;
}

macro_rules! impl_wire_value {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl WireValue for $ty {
                const WIRE_SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode<B: BufMut>(&self, buf: &mut B) {
                    buf.$put(*self);
                }

                #[inline]
                fn decode<B: Buf>(buf: &mut B) -> CurveResult<Self> {
                    Ok(buf.$get())
                }
            }
        )*
    };
}

impl_wire_value! {
    f32 => put_f32_le, get_f32_le;
    f64 => put_f64_le, get_f64_le;
    i32 => put_i32_le, get_i32_le;
    i64 => put_i64_le, get_i64_le;
    u32 => put_u32_le, get_u32_le;
    u64 => put_u64_le, get_u64_le;
}

impl WireValue for bool {
    const WIRE_SIZE: usize = 1;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(u8::from(*self));
    }

    fn decode<B: Buf>(buf: &mut B) -> CurveResult<Self> {
        match buf.get_u8() {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CurveError::InvalidValue(format!("bool byte {other}"))),
        }
    }
}

impl<T: WireValue + Copy + Default, const N: usize> WireValue for [T; N] {
    const WIRE_SIZE: usize = T::WIRE_SIZE * N;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        for item in self {
            item.encode(buf);
        }
    }

    fn decode<B: Buf>(buf: &mut B) -> CurveResult<Self> {
        let mut out = [T::default(); N];
        for slot in out.iter_mut() {
            *slot = T::decode(buf)?;
        }
        Ok(out)
    }
}

/// Encoded size of a store
pub fn encoded_len<T: WireValue>(count: usize) -> usize {
    HEADER_SIZE + count * (TIME_SIZE + T::WIRE_SIZE)
}

/// Keyframe count as stored in the header
fn wire_count(len: usize) -> CurveResult<u32> {
    u32::try_from(len).map_err(|_| CurveError::TooManyEntries {
        count: len,
        max: u32::MAX as usize,
    })
}

/// Encode every keyframe of a store.
///
/// Stores with more than `u32::MAX` keyframes are rejected.
pub fn encode_store<T: WireValue>(store: &TimeOrderedStore<T>) -> CurveResult<Bytes> {
    let count = wire_count(store.len())?;
    let mut buf = BytesMut::with_capacity(encoded_len::<T>(store.len()));
    buf.put_u32_le(CURVE_MAGIC);
    buf.put_u8(CODEC_VERSION);
    buf.put_u32_le(count);
    for entry in store.iter() {
        buf.put_i64_le(entry.time.as_micros());
        entry.value.encode(&mut buf);
    }
    Ok(buf.freeze())
}

/// Decode a store, enforcing or restoring time order
pub fn decode_store<T: WireValue>(
    mut buf: &[u8],
    order: DecodeOrder,
) -> CurveResult<TimeOrderedStore<T>> {
    if buf.len() < HEADER_SIZE {
        return Err(CurveError::BufferTooShort {
            expected: HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let magic = buf.get_u32_le();
    if magic != CURVE_MAGIC {
        return Err(CurveError::InvalidMagic(magic));
    }
    let version = buf.get_u8();
    if version != CODEC_VERSION {
        return Err(CurveError::UnsupportedVersion(version));
    }
    let count = buf.get_u32_le() as usize;

    let body = count
        .checked_mul(TIME_SIZE + T::WIRE_SIZE)
        .ok_or_else(|| CurveError::InvalidValue(format!("keyframe count {count}")))?;
    if buf.remaining() < body {
        return Err(CurveError::BufferTooShort {
            expected: HEADER_SIZE + body,
            actual: HEADER_SIZE + buf.remaining(),
        });
    }

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let time = Time::from_micros(buf.get_i64_le());
        let value = T::decode(&mut buf)?;
        entries.push(Keyframe::new(time, value));
    }

    if buf.has_remaining() {
        return Err(CurveError::TrailingBytes(buf.remaining()));
    }

    match order {
        DecodeOrder::Strict => TimeOrderedStore::try_from_sorted(entries).map_err(|err| {
            warn!(%err, "rejected out-of-order curve payload");
            err
        }),
        DecodeOrder::Resort => Ok(entries.into_iter().collect()),
    }
}

/// Encode the keyframes of a curve (the default value is not transmitted)
pub fn encode_curve<T: WireValue, M>(curve: &Curve<T, M>) -> CurveResult<Bytes> {
    encode_store(curve.store())
}

/// Decode keyframes into a curve with the given default
pub fn decode_curve<T: WireValue, M: Sample<T>>(
    buf: &[u8],
    default: T,
    order: DecodeOrder,
) -> CurveResult<Curve<T, M>> {
    let store = decode_store(buf, order)?;
    Ok(Curve::from_store(default, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InterpolatedCurve, SteppedCurve};

    fn t(ms: i64) -> Time {
        Time::from_millis(ms)
    }

    /// Hand-built payload with keyframes in the given order
    fn raw_payload(entries: &[(i64, f64)]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(CURVE_MAGIC);
        buf.put_u8(CODEC_VERSION);
        buf.put_u32_le(entries.len() as u32);
        for &(ms, value) in entries {
            buf.put_i64_le(t(ms).as_micros());
            buf.put_f64_le(value);
        }
        buf.to_vec()
    }

    #[test]
    fn test_curve_survives_encoding() {
        let mut curve = InterpolatedCurve::new(0.0f64);
        curve.set(t(10), 1.0);
        curve.set(t(0), 0.5);
        curve.set(t(20), 3.0);

        let bytes = encode_curve(&curve).unwrap();
        assert_eq!(bytes.len(), encoded_len::<f64>(3));

        let decoded: InterpolatedCurve<f64> =
            decode_curve(&bytes, 0.0, DecodeOrder::Strict).unwrap();
        let pairs: Vec<_> = decoded.iter().map(|e| (e.time, e.value)).collect();
        assert_eq!(pairs, vec![(t(0), 0.5), (t(10), 1.0), (t(20), 3.0)]);
        assert_eq!(decoded.get(t(15)), 2.0);
    }

    #[test]
    fn test_count_must_fit_header() {
        assert_eq!(wire_count(3), Ok(3));
        assert_eq!(wire_count(u32::MAX as usize), Ok(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_count_rejected() {
        let count = u32::MAX as usize + 1;
        assert_eq!(
            wire_count(count),
            Err(CurveError::TooManyEntries {
                count,
                max: u32::MAX as usize,
            })
        );
    }

    #[test]
    fn test_strict_rejects_unsorted() {
        let payload = raw_payload(&[(5, 1.0), (2, 2.0)]);
        let err = decode_store::<f64>(&payload, DecodeOrder::Strict).unwrap_err();
        assert!(matches!(err, CurveError::Unsorted { index: 1, .. }));
    }

    #[test]
    fn test_resort_restores_order() {
        let payload = raw_payload(&[(5, 1.0), (2, 2.0), (5, 3.0)]);
        let store = decode_store::<f64>(&payload, DecodeOrder::Resort).unwrap();
        let values: Vec<_> = store.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_header_validation() {
        assert!(matches!(
            decode_store::<f64>(&[0u8; 4], DecodeOrder::Strict),
            Err(CurveError::BufferTooShort { expected: 9, actual: 4 })
        ));

        let mut payload = raw_payload(&[]);
        payload[0] ^= 0xFF;
        assert!(matches!(
            decode_store::<f64>(&payload, DecodeOrder::Strict),
            Err(CurveError::InvalidMagic(_))
        ));

        let mut payload = raw_payload(&[]);
        payload[4] = CODEC_VERSION + 1;
        assert_eq!(
            decode_store::<f64>(&payload, DecodeOrder::Strict).unwrap_err(),
            CurveError::UnsupportedVersion(CODEC_VERSION + 1)
        );
    }

    #[test]
    fn test_truncated_and_trailing() {
        let mut payload = raw_payload(&[(1, 1.0), (2, 2.0)]);
        payload.truncate(payload.len() - 3);
        assert!(matches!(
            decode_store::<f64>(&payload, DecodeOrder::Strict),
            Err(CurveError::BufferTooShort { .. })
        ));

        let mut payload = raw_payload(&[(1, 1.0)]);
        payload.extend_from_slice(&[0, 0]);
        assert_eq!(
            decode_store::<f64>(&payload, DecodeOrder::Strict).unwrap_err(),
            CurveError::TrailingBytes(2)
        );
    }

    #[test]
    fn test_bool_and_array_values() {
        let mut flags = SteppedCurve::new(false);
        flags.set(t(1), true);
        flags.set(t(2), false);
        let decoded: SteppedCurve<bool> =
            decode_curve(&encode_curve(&flags).unwrap(), false, DecodeOrder::Strict).unwrap();
        assert!(decoded.get(t(1)));
        assert!(!decoded.get(t(2)));

        let mut bad = encode_curve(&flags).unwrap().to_vec();
        bad[HEADER_SIZE + TIME_SIZE] = 7;
        assert!(matches!(
            decode_store::<bool>(&bad, DecodeOrder::Strict),
            Err(CurveError::InvalidValue(_))
        ));

        let mut positions = InterpolatedCurve::new([0.0f32; 3]);
        positions.set(t(0), [1.0, 2.0, 3.0]);
        let decoded: InterpolatedCurve<[f32; 3]> =
            decode_curve(&encode_curve(&positions).unwrap(), [0.0; 3], DecodeOrder::Strict)
                .unwrap();
        assert_eq!(decoded.get(t(0)), [1.0, 2.0, 3.0]);
    }
}
