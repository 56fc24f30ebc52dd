#![warn(missing_docs)]
//! statbench Statistical Engine
//!
//! Numerical building blocks for the benchmark harness:
//! - Bootstrap confidence intervals for the mean and standard deviation
//!   (BCa for small samples, percentile otherwise)
//! - Quartile fences with mild/extreme outlier classification
//! - Sample autocorrelation with large-lag confidence bands
//! - An outlier variance model that tells whether block sd is dominated by
//!   a few outlier actions

mod autocorrelation;
mod bootstrap;
mod inflation;
mod outliers;
mod percentiles;
mod summary;

pub use autocorrelation::{LagCorrelation, Z_95, autocorrelation, correlogram};
pub use bootstrap::{
    BootstrapConfig, BootstrapError, BootstrapMethod, Estimate, Statistic, estimate,
};
pub use inflation::{MIN_ACTIONS, OutlierEffect, OutlierVariance, outlier_variance};
pub use outliers::{
    EXTREME_FENCE_FACTOR, Fences, FlaggedSample, MILD_FENCE_FACTOR, OutlierAnalysis,
    OutlierClass, detect_outliers,
};
pub use percentiles::{
    Quartiles, compute_quartiles, quantile_sorted, sorted_copy,
};
pub use summary::{mean, std_dev, variance};

/// Sample size below which the BCa interval is used instead of the percentile interval
pub const BCA_THRESHOLD: usize = 100;

/// Default number of bootstrap resamples
pub const DEFAULT_BOOTSTRAP_RESAMPLES: usize = 10_000;

/// Default confidence level (95%)
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
