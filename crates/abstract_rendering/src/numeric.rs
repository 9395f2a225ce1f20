//! Compile-time numeric dispatch for thresholds, statistics and interpolation.

/// Scalar aggregate types usable as contour levels and interpolation inputs.
pub trait Numeric: Copy + PartialOrd + Send + Sync + std::fmt::Debug + 'static {
    fn to_f64(self) -> f64;

    /// Converts back from `f64`, truncating toward zero for integer types.
    fn from_f64(value: f64) -> Self;

    /// Smallest value strictly greater than `self`.
    fn min_incr(self) -> Self;

    fn add_f64(self, more: f64) -> Self {
        Self::from_f64(self.to_f64() + more)
    }
}

macro_rules! impl_integer {
    ($($t:ty),*) => {$(
        impl Numeric for $t {
            fn to_f64(self) -> f64 { self as f64 }
            fn from_f64(value: f64) -> Self { value as $t }
            fn min_incr(self) -> Self { self.saturating_add(1) }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Numeric for $t {
            fn to_f64(self) -> f64 { self as f64 }
            fn from_f64(value: f64) -> Self { value as $t }
            fn min_incr(self) -> Self {
                if self.is_nan() || self == <$t>::INFINITY {
                    return self;
                }
                if self == 0.0 {
                    return <$t>::from_bits(1);
                }
                let bits = self.to_bits();
                if self > 0.0 { <$t>::from_bits(bits + 1) } else { <$t>::from_bits(bits - 1) }
            }
        }
    )*};
}

impl_integer!(i16, i32, i64);
impl_float!(f32, f64);

/// Observed extremes of a numeric grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats<N> {
    pub min: N,
    pub max: N,
}

impl<N: Numeric> Stats<N> {
    /// Min/max over a sequence, `None` when it is empty. NaN values are skipped.
    pub fn of<I: IntoIterator<Item = N>>(values: I) -> Option<Self> {
        let mut iter = values.into_iter().filter(|v| v.partial_cmp(v).is_some());
        let first = iter.next()?;
        Some(iter.fold(Stats { min: first, max: first }, |acc, v| Stats {
            min: if v < acc.min { v } else { acc.min },
            max: if v > acc.max { v } else { acc.max },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_incr() {
        assert_eq!(3i32.min_incr(), 4);
        assert_eq!(i16::MAX.min_incr(), i16::MAX);
        assert!(3.0f64.min_incr() > 3.0);
        assert_eq!(0.0f64.min_incr(), f64::from_bits(1));
        assert!((-1.0f32).min_incr() > -1.0);
    }

    #[test]
    fn test_add_truncates_for_integers() {
        assert_eq!(3i64.add_f64(2.9), 5);
        assert_eq!(1.5f64.add_f64(0.25), 1.75);
    }

    #[test]
    fn test_stats() {
        let stats = Stats::of(vec![4, -2, 9, 0]).unwrap();
        assert_eq!(stats, Stats { min: -2, max: 9 });
        assert!(Stats::<f64>::of(Vec::new()).is_none());
        let floats = Stats::of(vec![f64::NAN, 1.0, 2.0]).unwrap();
        assert_eq!(floats.max, 2.0);
    }
}
