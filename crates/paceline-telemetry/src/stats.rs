//! Pure aggregate functions over finite sequences of `f64`
//!
//! The engine distinguishes "no data" from "data present but zero":
//! [`min`], [`max`] and [`median`] fail with [`EmptyInputError`] on empty
//! input, while [`sum`] and [`count`] return 0 and [`average`] returns NaN
//! (a documented sentinel, not an error).

use serde::Serialize;
use thiserror::Error;

/// Statistics were requested over zero samples.
///
/// Recoverable by design: callers fall back to defaults (the scaling
/// controller assumes a 1s average task duration when it sees this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("statistics requested over empty input")]
pub struct EmptyInputError;

/// Aggregates computed once from a finite value sequence.
///
/// A plain value with no identity beyond its fields; recomputed on every
/// query rather than maintained incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub average: f64,
    pub median: f64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

impl Stats {
    /// Compute all aggregates over `values`.
    ///
    /// Fails with [`EmptyInputError`] when `values` is empty.
    pub fn from_values(values: &[f64]) -> Result<Self, EmptyInputError> {
        Ok(Self {
            average: average(values),
            median: median(values)?,
            sum: sum(values),
            min: min(values)?,
            max: max(values)?,
            count: count(values),
        })
    }
}

/// Arithmetic sum; 0.0 for empty input.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Number of values; 0 for empty input.
pub fn count(values: &[f64]) -> u64 {
    values.len() as u64
}

/// Arithmetic mean; NaN for empty input.
pub fn average(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

/// Smallest value.
pub fn min(values: &[f64]) -> Result<f64, EmptyInputError> {
    values
        .iter()
        .copied()
        .reduce(f64::min)
        .ok_or(EmptyInputError)
}

/// Largest value.
pub fn max(values: &[f64]) -> Result<f64, EmptyInputError> {
    values
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or(EmptyInputError)
}

/// Positional median after sorting.
///
/// Sorts a copy of the input, then takes the middle element for odd counts or
/// the mean of the two central elements for even counts. Insertion order of
/// the input is irrelevant.
pub fn median(values: &[f64]) -> Result<f64, EmptyInputError> {
    if values.is_empty() {
        return Err(EmptyInputError);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[middle - 1] + sorted[middle]) / 2.0)
    } else {
        Ok(sorted[middle])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_count() {
        assert_eq!(sum(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(count(&[1.0, 2.0]), 2);
        assert_eq!(count(&[]), 0);
    }

    #[test]
    fn test_average_empty_is_nan() {
        assert!(average(&[]).is_nan());
        assert_eq!(average(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min(&[3.0, 1.0, 2.0]), Ok(1.0));
        assert_eq!(max(&[3.0, 1.0, 2.0]), Ok(3.0));
        assert_eq!(min(&[]), Err(EmptyInputError));
        assert_eq!(max(&[]), Err(EmptyInputError));
    }

    #[test]
    fn test_median_sorts_before_selecting() {
        // Unsorted input: the positional-after-sort median, not raw order
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Ok(2.5));
    }

    #[test]
    fn test_median_odd_count() {
        assert_eq!(median(&[9.0, 1.0, 5.0]), Ok(5.0));
        assert_eq!(median(&[7.0]), Ok(7.0));
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), Err(EmptyInputError));
    }

    #[test]
    fn test_from_values() {
        let stats = Stats::from_values(&[0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.average, 2.0);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.sum, 10.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.count, 5);
    }

    #[test]
    fn test_from_values_empty() {
        assert_eq!(Stats::from_values(&[]), Err(EmptyInputError));
    }

    #[test]
    fn test_zero_data_is_not_empty_data() {
        let stats = Stats::from_values(&[0.0, 0.0]).unwrap();
        assert_eq!(stats.sum, 0.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.count, 2);
    }
}
