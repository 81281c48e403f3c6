//! Interpolation capability for continuous curves

/// A value that can be blended between two keyframes.
///
/// `fraction` is in `0.0..=1.0`: `0.0` yields `self`, `1.0` yields `other`.
/// Types without this capability cannot be stored in an interpolated curve.
pub trait Interpolate: Sized {
    fn interpolate(&self, other: &Self, fraction: f64) -> Self;
}

impl Interpolate for f64 {
    #[inline]
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        self + (other - self) * fraction
    }
}

impl Interpolate for f32 {
    #[inline]
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        self + (other - self) * fraction as f32
    }
}

macro_rules! impl_interpolate_int {
    ($($ty:ty),*) => {
        $(
            impl Interpolate for $ty {
                #[inline]
                fn interpolate(&self, other: &Self, fraction: f64) -> Self {
                    if fraction <= 0.0 {
                        return *self;
                    }
                    if fraction >= 1.0 {
                        return *other;
                    }
                    // Only the offset goes through f64, the endpoints stay exact
                    let a = i128::from(*self);
                    let delta = i128::from(*other) - a;
                    let offset = (delta as f64 * fraction).round() as i128;
                    (a + offset).clamp(i128::from(<$ty>::MIN), i128::from(<$ty>::MAX)) as $ty
                }
            }
        )*
    };
}

impl_interpolate_int!(i32, i64, u32, u64);

/// Flags switch only once the next keyframe is reached
impl Interpolate for bool {
    #[inline]
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        if fraction >= 1.0 {
            *other
        } else {
            *self
        }
    }
}

impl<T: Interpolate + Copy, const N: usize> Interpolate for [T; N] {
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        let mut out = *self;
        for (slot, (a, b)) in out.iter_mut().zip(self.iter().zip(other.iter())) {
            *slot = a.interpolate(b, fraction);
        }
        out
    }
}

impl<A: Interpolate, B: Interpolate> Interpolate for (A, B) {
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        (
            self.0.interpolate(&other.0, fraction),
            self.1.interpolate(&other.1, fraction),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_lerp() {
        assert_eq!(0.0f64.interpolate(&10.0, 0.5), 5.0);
        assert_eq!(2.0f32.interpolate(&4.0, 0.25), 2.5);
    }

    #[test]
    fn test_integer_rounds() {
        assert_eq!(0i64.interpolate(&3, 0.5), 2);
        assert_eq!(10u32.interpolate(&0, 0.5), 5);
    }

    #[test]
    fn test_integer_endpoints_exact_beyond_f64_precision() {
        let a: i64 = (1 << 53) + 1;
        let b: i64 = (1 << 53) + 11;
        assert_eq!(a.interpolate(&b, 0.0), a);
        assert_eq!(a.interpolate(&b, 1.0), b);
        assert_eq!(a.interpolate(&b, 0.5), a + 5);

        assert_eq!(u64::MAX.interpolate(&(u64::MAX - 10), 0.0), u64::MAX);
        assert_eq!(u64::MAX.interpolate(&0, 0.5), u64::MAX / 2);
        assert_eq!(i64::MIN.interpolate(&i64::MAX, 1.0), i64::MAX);
    }

    #[test]
    fn test_bool_steps_at_end() {
        assert!(!false.interpolate(&true, 0.99));
        assert!(false.interpolate(&true, 1.0));
    }

    #[test]
    fn test_array_and_pair() {
        let a = [0.0f64, 10.0, -4.0];
        let b = [10.0f64, 20.0, 4.0];
        assert_eq!(a.interpolate(&b, 0.5), [5.0, 15.0, 0.0]);

        let p = (0.0f64, 100i32);
        assert_eq!(p.interpolate(&(1.0, 200), 0.5), (0.5, 150));
    }
}
