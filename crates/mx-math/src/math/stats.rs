//! Summary statistics over the finite subset of a sample.
//!
//! Object measurements routinely contain NaN or infinite values. These
//! helpers drop such values before computing a statistic, so a NaN never
//! poisons a per-image aggregate. An empty finite subset yields NaN and it
//! is the caller's decision how to store that.

use serde::{Deserialize, Serialize};

/// Copy of `values` with non-finite entries removed, order preserved.
pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean of the finite values.
pub fn finite_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.iter().filter(|v| v.is_finite()) {
        sum += v;
        n += 1;
    }
    if n == 0 {
        return f64::NAN;
    }
    sum / n as f64
}

/// Median of the finite values; the mean of the two middle values for an
/// even count.
pub fn finite_median(values: &[f64]) -> f64 {
    let mut finite = finite_values(values);
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    }
}

/// Population standard deviation (divisor `n`) of the finite values.
pub fn finite_std_dev(values: &[f64]) -> f64 {
    let mean = finite_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let mut sq = 0.0;
    let mut n = 0usize;
    for v in values.iter().filter(|v| v.is_finite()) {
        let d = v - mean;
        sq += d * d;
        n += 1;
    }
    (sq / n as f64).sqrt()
}

/// All three statistics at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiniteSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl FiniteSummary {
    pub fn of(values: &[f64]) -> Self {
        Self {
            count: values.iter().filter(|v| v.is_finite()).count(),
            mean: finite_mean(values),
            median: finite_median(values),
            std_dev: finite_std_dev(values),
        }
    }
}
