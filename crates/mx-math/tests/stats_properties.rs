//! Property-based tests for finite-subset statistics.

use mx_math::{finite_mean, finite_median, finite_std_dev, finite_values};
use proptest::prelude::*;

fn sample_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            8 => -1.0e6..1.0e6f64,
            1 => Just(f64::NAN),
            1 => Just(f64::INFINITY),
        ],
        0..64,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Mean and median stay inside the finite range.
    #[test]
    fn central_values_within_finite_bounds(values in sample_strategy()) {
        let finite = finite_values(&values);
        prop_assume!(!finite.is_empty());
        let lo = finite.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = finite_mean(&values);
        let median = finite_median(&values);
        prop_assert!(
            mean >= lo - 1e-6 && mean <= hi + 1e-6,
            "mean {} outside [{}, {}]",
            mean,
            lo,
            hi
        );
        prop_assert!(median >= lo && median <= hi, "median {} outside [{}, {}]", median, lo, hi);
    }

    /// Statistics are NaN exactly when there is no finite value.
    #[test]
    fn nan_iff_no_finite_values(values in sample_strategy()) {
        let empty = finite_values(&values).is_empty();
        prop_assert_eq!(finite_mean(&values).is_nan(), empty);
        prop_assert_eq!(finite_median(&values).is_nan(), empty);
        prop_assert_eq!(finite_std_dev(&values).is_nan(), empty);
    }

    /// Standard deviation is never negative.
    #[test]
    fn std_dev_non_negative(values in sample_strategy()) {
        let sd = finite_std_dev(&values);
        prop_assert!(sd.is_nan() || sd >= 0.0);
    }
}
