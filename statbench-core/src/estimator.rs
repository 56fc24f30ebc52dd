//! Statistics Estimation
//!
//! Bootstrap estimates of the block mean and sd, and the check of the task's
//! sd against the environmental noise floor.

use crate::config::BenchmarkConfig;
use crate::error::BenchError;
use crate::stats::Stats;
use statbench_stats::{Statistic, estimate};

/// Turns block durations into [`Stats`]
#[derive(Debug, Clone, Copy)]
pub struct StatisticsEstimator<'c> {
    config: &'c BenchmarkConfig,
}

impl<'c> StatisticsEstimator<'c> {
    /// Estimator using the confidence level and resamples of `config`
    pub fn new(config: &'c BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Bootstrap the block mean and sd.
    ///
    /// A single sample, or samples that are all equal, produce degenerate
    /// intervals equal to the point estimate.
    pub fn block_stats(&self, durations: &[f64]) -> Result<Stats, BenchError> {
        let bootstrap = self.config.bootstrap();
        let mean = estimate(durations, Statistic::Mean, &bootstrap)?;
        let sd = estimate(durations, Statistic::Sd, &bootstrap)?;
        tracing::debug!(
            mean = mean.point,
            sd = sd.point,
            method = ?mean.method,
            resamples = bootstrap.resamples,
            "bootstrapped block statistics"
        );
        Ok(Stats::from_estimates(&mean, &sd, None)?)
    }

    /// Compare the task's block sd to the noise floor's.
    ///
    /// Both sds are normalised by the square root of their block means before
    /// comparing. Returns the issue text, or `None` unless the noise explains
    /// more than `sd_fraction_threshold` of the task sd.
    pub fn sd_validity(&self, task: &Stats, noise: Option<&Stats>) -> Option<String> {
        let Some(noise) = noise else {
            return Some(
                "sd validity unknown: noise floor estimation is disabled".to_string(),
            );
        };

        let Some(fraction) = noise_fraction(task, noise) else {
            return Some(
                "sd validity unknown: a block mean of zero cannot be normalised".to_string(),
            );
        };

        (fraction > self.config.sd_fraction_threshold()).then(|| {
            format!(
                "environmental noise may explain at least {:.1}% of the measured sd, so the sd may be \
                 unreliable (task sd/sqrt(mean) = {}, noise floor sd/sqrt(mean) = {}, threshold = {:.1}%)",
                fraction * 100.0,
                statbench_report::format_engineering(task.sd() / task.mean().sqrt(), 3),
                statbench_report::format_engineering(noise.sd() / noise.mean().sqrt(), 3),
                self.config.sd_fraction_threshold() * 100.0,
            )
        })
    }
}

/// Share of the task's normalised sd covered by the noise floor, capped at 1
fn noise_fraction(task: &Stats, noise: &Stats) -> Option<f64> {
    if task.mean() <= 0.0 || noise.mean() <= 0.0 {
        return None;
    }
    let task_norm = task.sd() / task.mean().sqrt();
    let noise_norm = noise.sd() / noise.mean().sqrt();

    Some(if task_norm == 0.0 {
        if noise_norm > 0.0 { 1.0 } else { 0.0 }
    } else {
        (noise_norm / task_norm).min(1.0)
    })
}
