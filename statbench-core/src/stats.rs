//! Benchmark Statistics
//!
//! Point estimates and confidence intervals for the mean and sd of block
//! durations, plus the advisory issues attached to the sd.

use crate::error::StatsError;
use statbench_report::{StatsSummary, format_engineering, format_seconds};
use statbench_stats::{Estimate, OutlierVariance, outlier_variance};
use std::fmt;

/// Mean and sd estimates with confidence intervals, all in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    mean: f64,
    mean_lower: f64,
    mean_upper: f64,
    sd: f64,
    sd_lower: f64,
    sd_upper: f64,
    sd_issues: Option<String>,
}

fn check(field: &'static str, value: f64) -> Result<(), StatsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StatsError::NotNormal { field, value })
    }
}

impl Stats {
    /// Build from raw values. Every number must be finite and `>= 0`, and an
    /// sd issue must not be blank.
    pub fn new(
        mean: f64,
        mean_lower: f64,
        mean_upper: f64,
        sd: f64,
        sd_lower: f64,
        sd_upper: f64,
        sd_issues: Option<String>,
    ) -> Result<Self, StatsError> {
        check("mean", mean)?;
        check("mean_lower", mean_lower)?;
        check("mean_upper", mean_upper)?;
        check("sd", sd)?;
        check("sd_lower", sd_lower)?;
        check("sd_upper", sd_upper)?;
        if sd_issues.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(StatsError::BlankIssue);
        }

        Ok(Self {
            mean,
            mean_lower,
            mean_upper,
            sd,
            sd_lower,
            sd_upper,
            sd_issues,
        })
    }

    /// Build from bootstrap estimates, clamping each interval so it contains
    /// its point estimate and stays non-negative
    pub fn from_estimates(
        mean: &Estimate,
        sd: &Estimate,
        sd_issues: Option<String>,
    ) -> Result<Self, StatsError> {
        let (mean_lower, mean_upper) = clamp_interval(mean);
        let (sd_lower, sd_upper) = clamp_interval(sd);
        Self::new(
            mean.point,
            mean_lower,
            mean_upper,
            sd.point,
            sd_lower,
            sd_upper,
            sd_issues,
        )
    }

    /// Per-action statistics for blocks of `actions` actions.
    ///
    /// Means scale by `1/a`, sds by `1/√a`. When `a >= 16` the outlier
    /// variance model is applied and its verdict is appended to the sd
    /// issues if outliers carry more than 1% of the block variance.
    pub fn for_actions(&self, actions: u64) -> Result<Stats, StatsError> {
        if actions == 0 {
            return Err(StatsError::ZeroActions);
        }
        let a = actions as f64;
        let sqrt_a = a.sqrt();

        let inflation = outlier_variance(self.mean, self.sd, a)
            .filter(|model| inflation_matters(model.fraction))
            .map(|model| inflation_issue(&model));
        let sd_issues = match (self.sd_issues.clone(), inflation) {
            (Some(existing), Some(extra)) => Some(format!("{existing}\n{extra}")),
            (existing, extra) => existing.or(extra),
        };

        Stats::new(
            self.mean / a,
            self.mean_lower / a,
            self.mean_upper / a,
            self.sd / sqrt_a,
            self.sd_lower / sqrt_a,
            self.sd_upper / sqrt_a,
            sd_issues,
        )
    }

    /// Same statistics with `sd_issues` replacing the current issue text
    pub fn with_sd_issues(self, sd_issues: Option<String>) -> Result<Self, StatsError> {
        Self::new(
            self.mean,
            self.mean_lower,
            self.mean_upper,
            self.sd,
            self.sd_lower,
            self.sd_upper,
            sd_issues,
        )
    }

    /// Mean estimate
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Lower bound of the mean interval
    pub fn mean_lower(&self) -> f64 {
        self.mean_lower
    }

    /// Upper bound of the mean interval
    pub fn mean_upper(&self) -> f64 {
        self.mean_upper
    }

    /// Standard deviation estimate
    pub fn sd(&self) -> f64 {
        self.sd
    }

    /// Lower bound of the sd interval
    pub fn sd_lower(&self) -> f64 {
        self.sd_lower
    }

    /// Upper bound of the sd interval
    pub fn sd_upper(&self) -> f64 {
        self.sd_upper
    }

    /// sd validity and outlier-variance issue text
    pub fn sd_issues(&self) -> Option<&str> {
        self.sd_issues.as_deref()
    }

    /// `mean = ... (CI deltas: -..., +...), sd = ... (CI deltas: -..., +...)`
    pub fn describe(&self) -> String {
        format!(
            "mean = {} (CI deltas: -{}, +{}), sd = {} (CI deltas: -{}, +{})",
            format_seconds(self.mean),
            format_seconds(self.mean - self.mean_lower),
            format_seconds(self.mean_upper - self.mean),
            format_seconds(self.sd),
            format_seconds(self.sd - self.sd_lower),
            format_seconds(self.sd_upper - self.sd),
        )
    }

    /// Serializable summary at `confidence_level`
    pub fn to_summary(&self, confidence_level: f64) -> StatsSummary {
        StatsSummary {
            mean: self.mean,
            mean_lower: self.mean_lower,
            mean_upper: self.mean_upper,
            sd: self.sd,
            sd_lower: self.sd_lower,
            sd_upper: self.sd_upper,
            confidence_level,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn clamp_interval(estimate: &Estimate) -> (f64, f64) {
    let lower = estimate.lower.min(estimate.point).max(0.0);
    let upper = estimate.upper.max(estimate.point);
    (lower, upper)
}

/// Share of block variance above which outliers are reported
const INFLATION_ISSUE_FRACTION: f64 = 0.01;

fn inflation_matters(fraction: f64) -> bool {
    fraction > INFLATION_ISSUE_FRACTION
}

fn inflation_issue(model: &OutlierVariance) -> String {
    format!(
        "the action sd is {} inflated by outliers: they carry at least {:.1}% of the block variance \
         (a = {}, muB = {}, sigmaB = {}, muA = {}, sigmaA = {}, muGMin = {}, sigmaG = {}, \
         cMax = {}, cOutMin = {}, varOutMin = {} s^2, muGOutMin = {}, UOutMin = {})",
        model.effect.qualifier(),
        model.fraction * 100.0,
        model.a,
        format_seconds(model.mu_b),
        format_seconds(model.sigma_b),
        format_seconds(model.mu_a),
        format_seconds(model.sigma_a),
        format_seconds(model.mu_g_min),
        format_seconds(model.sigma_g),
        model.c_max,
        model.c_out_min,
        format_engineering(model.var_out_min, 3),
        format_seconds(model.mu_g_out_min),
        format_seconds(model.u_out_min),
    )
}
