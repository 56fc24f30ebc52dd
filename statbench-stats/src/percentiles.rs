//! Quantile Computation
//!
//! Rank-interpolation quantiles (linear interpolation at rank `p * (n - 1)`),
//! used for the quartile fences of the outlier diagnostic.

use std::cmp::Ordering;

/// First quartile, median and third quartile of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    /// 25th percentile
    pub q1: f64,
    /// 50th percentile
    pub median: f64,
    /// 75th percentile
    pub q3: f64,
}

impl Quartiles {
    /// Interquartile range `q3 - q1`
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Sort a copy of `samples` in ascending order (NaN-tolerant total order)
pub fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Quantile of an already sorted slice, `p` in `[0, 1]`.
///
/// Returns 0.0 for an empty slice.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower_idx = rank.floor() as usize;
            let upper_idx = (lower_idx + 1).min(n - 1);
            let fraction = rank - lower_idx as f64;

            sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
        }
    }
}

/// Compute the quartiles of an already sorted slice
pub fn compute_quartiles(sorted: &[f64]) -> Quartiles {
    Quartiles {
        q1: quantile_sorted(sorted, 0.25),
        median: quantile_sorted(sorted, 0.5),
        q3: quantile_sorted(sorted, 0.75),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let samples = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((quantile_sorted(&sorted_copy(&samples), 0.5) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolated_quartiles() {
        let sorted: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let q = compute_quartiles(&sorted);

        // rank 0.25 * 99 = 24.75 -> 25 + 0.75
        assert!((q.q1 - 25.75).abs() < 1e-12);
        assert!((q.median - 50.5).abs() < 1e-12);
        assert!((q.q3 - 75.25).abs() < 1e-12);
        assert!((q.iqr() - 49.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(quantile_sorted(&[42.0], 0.9), 42.0);
        assert_eq!(quantile_sorted(&[], 0.5), 0.0);
    }

    #[test]
    fn test_extremes() {
        let sorted = sorted_copy(&[3.0, 1.0, 2.0]);
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 3.0);
    }
}
