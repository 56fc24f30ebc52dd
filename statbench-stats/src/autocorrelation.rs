//! Autocorrelation
//!
//! Sample autocorrelation function with large-lag (Bartlett) confidence bands
//! computed under the hypothesis that the series is uncorrelated noise.

/// Two-sided 95% standard normal quantile
pub const Z_95: f64 = 1.959963984540054;

/// Autocorrelation coefficient for one lag, with its null-hypothesis band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagCorrelation {
    /// Lag (1-based)
    pub lag: usize,
    /// Sample autocorrelation `r_k`
    pub r: f64,
    /// Expected value of `r_k` for white noise (`-1/N`)
    pub expected: f64,
    /// Large-lag standard deviation of `r_k`
    pub sd: f64,
    /// Lower band edge
    pub lower: f64,
    /// Upper band edge
    pub upper: f64,
}

impl LagCorrelation {
    /// Whether `r` lies outside the band
    pub fn is_outside(&self) -> bool {
        self.r < self.lower || self.r > self.upper
    }

    /// Signed deviation of `r` from its expected value, in units of `sd`
    pub fn deviation_sd(&self) -> f64 {
        if self.sd == 0.0 {
            return 0.0;
        }
        (self.r - self.expected) / self.sd
    }
}

/// Sample autocorrelation `r_0..=r_max_lag`.
///
/// `r_k = c_k / c_0` with `c_k = (1/N) Σ (x_i - x̄)(x_{i+k} - x̄)`.
/// Returns `None` for fewer than two samples or a zero-variance series.
pub fn autocorrelation(samples: &[f64], max_lag: usize) -> Option<Vec<f64>> {
    let n = samples.len();
    if n < 2 {
        return None;
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = samples.iter().map(|x| x - mean).collect();
    let c0 = centered.iter().map(|d| d * d).sum::<f64>() / n as f64;
    if c0 == 0.0 || !c0.is_finite() {
        return None;
    }

    let max_lag = max_lag.min(n - 1);
    let r = (0..=max_lag)
        .map(|k| {
            let ck = centered[..n - k]
                .iter()
                .zip(&centered[k..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64;
            ck / c0
        })
        .collect();

    Some(r)
}

/// Autocorrelation for lags `1..=max_lag` with 95% bands.
///
/// The band for lag `k` is `-1/N ± z·sqrt((1 + 2 Σ_{j<k} r_j²) / N)`.
pub fn correlogram(samples: &[f64], max_lag: usize) -> Option<Vec<LagCorrelation>> {
    let r = autocorrelation(samples, max_lag)?;
    let n = samples.len() as f64;
    let expected = -1.0 / n;

    let mut sum_sq = 0.0;
    let mut lags = Vec::with_capacity(r.len().saturating_sub(1));
    for (lag, &rk) in r.iter().enumerate().skip(1) {
        let sd = ((1.0 + 2.0 * sum_sq) / n).sqrt();
        lags.push(LagCorrelation {
            lag,
            r: rk,
            expected,
            sd,
            lower: expected - Z_95 * sd,
            upper: expected + Z_95 * sd,
        });
        sum_sq += rk * rk;
    }

    Some(lags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_zero_is_one() {
        let samples: Vec<f64> = (0..20).map(|i| (i as f64).sin()).collect();
        let r = autocorrelation(&samples, 5).unwrap();

        assert!((r[0] - 1.0).abs() < 1e-12);
        assert_eq!(r.len(), 6);
    }

    #[test]
    fn test_alternating_series() {
        let samples: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let r = autocorrelation(&samples, 2).unwrap();

        assert!(r[1] < -0.95);
        assert!(r[2] > 0.95);
    }

    #[test]
    fn test_constant_series() {
        assert!(autocorrelation(&[3.0; 10], 3).is_none());
        assert!(correlogram(&[3.0; 10], 3).is_none());
    }

    #[test]
    fn test_bands_widen_with_lag() {
        let samples: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let lags = correlogram(&samples, 5).unwrap();

        assert_eq!(lags.len(), 5);
        assert_eq!(lags[0].lag, 1);
        assert!(lags[1].sd > lags[0].sd);
        assert!(lags[0].is_outside());
        assert!(lags[0].deviation_sd() > 0.0);
    }

    #[test]
    fn test_max_lag_clamped() {
        let r = autocorrelation(&[1.0, 2.0, 4.0], 10).unwrap();
        assert_eq!(r.len(), 3);
    }
}
