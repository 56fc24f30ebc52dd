//! Bootstrap Resampling
//!
//! Point estimates and confidence intervals for the mean and the standard
//! deviation of a sample. Uses the BCa (bias-corrected and accelerated) interval
//! for small samples and the plain percentile interval otherwise.

use crate::summary::{mean, std_dev};
use crate::{BCA_THRESHOLD, DEFAULT_BOOTSTRAP_RESAMPLES, DEFAULT_CONFIDENCE_LEVEL};
use rand::Rng;
use rand::thread_rng;
use rayon::prelude::*;
use std::cmp::Ordering;
use thiserror::Error;

/// Statistic to estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    /// Arithmetic mean
    Mean,
    /// Sample standard deviation
    Sd,
}

impl Statistic {
    /// Evaluate the statistic on a sample
    pub fn evaluate(self, samples: &[f64]) -> f64 {
        match self {
            Statistic::Mean => mean(samples),
            Statistic::Sd => std_dev(samples),
        }
    }

    /// Short name used in reports
    pub fn name(self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Sd => "sd",
        }
    }
}

impl std::str::FromStr for Statistic {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Statistic::Mean),
            "sd" => Ok(Statistic::Sd),
            other => Err(BootstrapError::UnknownStatistic(other.to_string())),
        }
    }
}

/// Bootstrap configuration
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Number of resamples
    pub resamples: usize,
    /// Confidence level (e.g. 0.95)
    pub confidence_level: f64,
    /// Whether to resample on the rayon pool
    pub parallel: bool,
    /// Force BCa method even for large samples
    pub force_bca: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: DEFAULT_BOOTSTRAP_RESAMPLES,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            parallel: true,
            force_bca: false,
        }
    }
}

/// Which interval construction was used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapMethod {
    /// Percentile method (large samples)
    Percentile,
    /// BCa method (small samples or forced)
    Bca,
    /// No resampling: the sample has no spread, the interval collapses to the point
    Degenerate,
}

/// Point estimate with confidence bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Statistic evaluated on the original sample
    pub point: f64,
    /// Lower confidence bound
    pub lower: f64,
    /// Upper confidence bound
    pub upper: f64,
    /// Confidence level of the bounds
    pub level: f64,
    /// Standard error from the bootstrap distribution
    pub standard_error: f64,
    /// Interval construction used
    pub method: BootstrapMethod,
}

/// Errors that can occur during bootstrap
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Empty sample
    #[error("no samples to resample")]
    NoSamples,

    /// Confidence level outside (0, 1)
    #[error("invalid confidence level: {0} (must be strictly between 0 and 1)")]
    InvalidConfidenceLevel(f64),

    /// Zero resamples requested
    #[error("resample count must be positive")]
    NoResamples,

    /// Statistic name not recognised
    #[error("unknown statistic {0:?} (expected \"mean\" or \"sd\")")]
    UnknownStatistic(String),
}

/// Estimate `statistic` for `samples` with a bootstrap confidence interval.
///
/// A sample of size one or with zero variance yields a degenerate estimate
/// whose bounds equal the point estimate.
pub fn estimate(
    samples: &[f64],
    statistic: Statistic,
    config: &BootstrapConfig,
) -> Result<Estimate, BootstrapError> {
    if samples.is_empty() {
        return Err(BootstrapError::NoSamples);
    }
    if !(config.confidence_level > 0.0 && config.confidence_level < 1.0) {
        return Err(BootstrapError::InvalidConfidenceLevel(
            config.confidence_level,
        ));
    }
    if config.resamples == 0 {
        return Err(BootstrapError::NoResamples);
    }

    let first = samples[0];
    if samples.iter().all(|&x| x == first) {
        // summing would leave rounding residue on both statistics
        let point = match statistic {
            Statistic::Mean => first,
            Statistic::Sd => 0.0,
        };
        return Ok(Estimate {
            point,
            lower: point,
            upper: point,
            level: config.confidence_level,
            standard_error: 0.0,
            method: BootstrapMethod::Degenerate,
        });
    }

    let point = statistic.evaluate(samples);
    let mut replicates = if config.parallel {
        resample_parallel(samples, statistic, config.resamples)
    } else {
        resample_serial(samples, statistic, config.resamples)
    };

    let replicate_mean = mean(&replicates);
    let standard_error = (replicates
        .iter()
        .map(|x| (x - replicate_mean).powi(2))
        .sum::<f64>()
        / replicates.len() as f64)
        .sqrt();

    let use_bca = config.force_bca || samples.len() < BCA_THRESHOLD;
    let (lower, upper, method) = if use_bca {
        let (lo, hi) = bca_interval(
            samples,
            statistic,
            point,
            &mut replicates,
            config.confidence_level,
        );
        (lo, hi, BootstrapMethod::Bca)
    } else {
        replicates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let (lo, hi) = percentile_interval(&replicates, config.confidence_level);
        (lo, hi, BootstrapMethod::Percentile)
    };

    Ok(Estimate {
        point,
        lower,
        upper,
        level: config.confidence_level,
        standard_error,
        method,
    })
}

fn resample_once<R: Rng>(samples: &[f64], buf: &mut Vec<f64>, rng: &mut R) {
    buf.clear();
    buf.extend((0..samples.len()).map(|_| samples[rng.gen_range(0..samples.len())]));
}

/// Bootstrap replicates on the rayon pool
fn resample_parallel(samples: &[f64], statistic: Statistic, resamples: usize) -> Vec<f64> {
    (0..resamples)
        .into_par_iter()
        .map_init(
            || (thread_rng(), Vec::with_capacity(samples.len())),
            |(rng, buf), _| {
                resample_once(samples, buf, rng);
                statistic.evaluate(buf)
            },
        )
        .collect()
}

/// Bootstrap replicates on the calling thread
fn resample_serial(samples: &[f64], statistic: Statistic, resamples: usize) -> Vec<f64> {
    let mut rng = thread_rng();
    let mut buf = Vec::with_capacity(samples.len());
    (0..resamples)
        .map(|_| {
            resample_once(samples, &mut buf, &mut rng);
            statistic.evaluate(&buf)
        })
        .collect()
}

/// Percentile interval over sorted replicates
fn percentile_interval(sorted: &[f64], confidence: f64) -> (f64, f64) {
    let n = sorted.len();
    let alpha = (1.0 - confidence) / 2.0;

    let lower_idx = ((alpha * n as f64).floor() as usize).min(n - 1);
    let upper_idx = (((1.0 - alpha) * n as f64).floor() as usize).min(n - 1);

    (sorted[lower_idx], sorted[upper_idx])
}

/// BCa interval; sorts `replicates` in place
fn bca_interval(
    samples: &[f64],
    statistic: Statistic,
    theta_hat: f64,
    replicates: &mut [f64],
    confidence: f64,
) -> (f64, f64) {
    let n = samples.len();
    let b = replicates.len();

    // Bias correction
    let count_below = replicates.iter().filter(|&&x| x < theta_hat).count();
    let prop = count_below as f64 / b as f64;
    let z0 = normal_quantile(prop.clamp(0.0001, 0.9999));

    // Acceleration via jackknife
    let mut leave_one_out = Vec::with_capacity(n - 1);
    let jackknife: Vec<f64> = (0..n)
        .map(|i| {
            leave_one_out.clear();
            leave_one_out.extend(
                samples
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, &v)| v),
            );
            statistic.evaluate(&leave_one_out)
        })
        .collect();

    let jack_mean = mean(&jackknife);
    let numerator: f64 = jackknife.iter().map(|x| (jack_mean - x).powi(3)).sum();
    let denominator: f64 = jackknife.iter().map(|x| (jack_mean - x).powi(2)).sum();
    let a = if denominator.abs() < 1e-300 {
        0.0
    } else {
        numerator / (6.0 * denominator.powf(1.5))
    };

    let alpha = (1.0 - confidence) / 2.0;
    let z_alpha = normal_quantile(alpha);
    let z_1_alpha = normal_quantile(1.0 - alpha);

    let alpha1 = normal_cdf(z0 + (z0 + z_alpha) / (1.0 - a * (z0 + z_alpha)));
    let alpha2 = normal_cdf(z0 + (z0 + z_1_alpha) / (1.0 - a * (z0 + z_1_alpha)));

    replicates.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));
    let lower_idx = ((alpha1 * b as f64).floor() as usize).min(b - 1);
    let upper_idx = ((alpha2 * b as f64).floor() as usize).min(b - 1);

    (replicates[lower_idx], replicates[upper_idx])
}

/// Standard normal quantile (Abramowitz and Stegun 26.2.23)
fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let p = p.clamp(1e-10, 1.0 - 1e-10);
    let sign = if p < 0.5 { -1.0 } else { 1.0 };
    let p = if p < 0.5 { p } else { 1.0 - p };

    let t = (-2.0 * p.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;
    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let x = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);

    sign * x
}

/// Standard normal CDF
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function (Abramowitz and Stegun 7.1.26)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> BootstrapConfig {
        BootstrapConfig {
            resamples: 2000,
            ..Default::default()
        }
    }

    #[test]
    fn test_mean_interval_contains_point() {
        let samples: Vec<f64> = (0..100).map(|x| x as f64).collect();
        let est = estimate(&samples, Statistic::Mean, &quick_config()).unwrap();

        assert!((est.point - 49.5).abs() < 1e-9);
        assert!(est.lower < est.point);
        assert!(est.upper > est.point);
        assert_eq!(est.method, BootstrapMethod::Percentile);
    }

    #[test]
    fn test_sd_interval() {
        let samples: Vec<f64> = (0..60).map(|x| (x % 10) as f64).collect();
        let est = estimate(&samples, Statistic::Sd, &quick_config()).unwrap();

        assert!((est.point - std_dev(&samples)).abs() < 1e-12);
        assert!(est.lower > 0.0);
        assert!(est.lower <= est.upper);
        assert_eq!(est.method, BootstrapMethod::Bca);
    }

    #[test]
    fn test_serial_matches_parallel_shape() {
        let samples: Vec<f64> = (0..30).map(|x| 1.0 + x as f64 * 0.01).collect();
        let config = BootstrapConfig {
            parallel: false,
            ..quick_config()
        };
        let est = estimate(&samples, Statistic::Mean, &config).unwrap();
        assert!(est.lower <= est.point && est.point <= est.upper);
    }

    #[test]
    fn test_constant_samples_degenerate() {
        let samples = vec![2.5; 60];
        let mean_est = estimate(&samples, Statistic::Mean, &quick_config()).unwrap();
        let sd_est = estimate(&samples, Statistic::Sd, &quick_config()).unwrap();

        assert_eq!(mean_est.method, BootstrapMethod::Degenerate);
        assert_eq!(mean_est.point, 2.5);
        assert_eq!(mean_est.lower, 2.5);
        assert_eq!(sd_est.point, 0.0);
        assert_eq!(sd_est.upper, 0.0);
    }

    #[test]
    fn test_constant_samples_are_exact() {
        // 0.002 summed 60 times and divided back is not 0.002
        let samples = vec![0.002; 60];
        let mean_est = estimate(&samples, Statistic::Mean, &quick_config()).unwrap();
        let sd_est = estimate(&samples, Statistic::Sd, &quick_config()).unwrap();

        assert_eq!(mean_est.point, 0.002);
        assert_eq!(mean_est.upper, 0.002);
        assert_eq!(sd_est.point, 0.0);
        assert_eq!(sd_est.lower, 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            estimate(&[], Statistic::Mean, &quick_config()),
            Err(BootstrapError::NoSamples)
        ));

        let config = BootstrapConfig {
            confidence_level: 1.0,
            ..quick_config()
        };
        assert!(matches!(
            estimate(&[1.0, 2.0], Statistic::Mean, &config),
            Err(BootstrapError::InvalidConfidenceLevel(_))
        ));
    }

    #[test]
    fn test_statistic_names() {
        assert_eq!("mean".parse::<Statistic>().unwrap(), Statistic::Mean);
        assert_eq!("sd".parse::<Statistic>().unwrap(), Statistic::Sd);
        assert!("median".parse::<Statistic>().is_err());
    }

    #[test]
    fn test_normal_quantile() {
        assert!(normal_quantile(0.5).abs() < 0.01);
        assert!((normal_quantile(0.975) - 1.96).abs() < 0.01);
        assert!((normal_quantile(0.025) + 1.96).abs() < 0.01);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 0.01);
        assert!((normal_cdf(1.96) - 0.975).abs() < 0.01);
    }
}
