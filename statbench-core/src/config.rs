//! Benchmark Configuration
//!
//! Every field is validated when it is set, so a `BenchmarkConfig` in hand is
//! always usable. Configs are hashable: the noise-floor cache is keyed on them.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use statbench_stats::{BootstrapConfig, DEFAULT_BOOTSTRAP_RESAMPLES, DEFAULT_CONFIDENCE_LEVEL};
use std::hash::{Hash, Hasher};

/// Measurement parameters for one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    measure_cpu_time: bool,
    many_executions: bool,
    warmup_seconds: f64,
    execution_time_goal_seconds: f64,
    number_measurements: usize,
    cleanup_fraction_threshold: f64,
    confidence_level: f64,
    estimate_noise_floor: bool,
    sd_fraction_threshold: f64,
    number_actions_per_call: u64,
    bootstrap_resamples: usize,
    max_regime_retries: Option<u32>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            measure_cpu_time: false,
            many_executions: true,
            warmup_seconds: 10.0,
            execution_time_goal_seconds: 1.0,
            number_measurements: 60,
            cleanup_fraction_threshold: 0.01,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            estimate_noise_floor: false,
            sd_fraction_threshold: 0.01,
            number_actions_per_call: 1,
            bootstrap_resamples: DEFAULT_BOOTSTRAP_RESAMPLES,
            max_regime_retries: None,
        }
    }
}

type ConfigKey = (
    bool,
    bool,
    u64,
    u64,
    usize,
    u64,
    u64,
    bool,
    u64,
    u64,
    usize,
    Option<u32>,
);

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl BenchmarkConfig {
    /// Defaults scaled down for smoke runs: 5 s warmup, 50 ms blocks, 20 blocks
    pub fn quick() -> Self {
        Self {
            warmup_seconds: 5.0,
            execution_time_goal_seconds: 0.05,
            number_measurements: 20,
            ..Self::default()
        }
    }

    /// Re-check every field. Needed after deserialising.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.warmup_seconds) {
            return Err(ConfigError::WarmupSeconds(self.warmup_seconds));
        }
        if !positive(self.execution_time_goal_seconds) {
            return Err(ConfigError::ExecutionTimeGoal(
                self.execution_time_goal_seconds,
            ));
        }
        if self.number_measurements == 0 {
            return Err(ConfigError::NumberMeasurements);
        }
        if !positive(self.cleanup_fraction_threshold) {
            return Err(ConfigError::CleanupFractionThreshold(
                self.cleanup_fraction_threshold,
            ));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigError::ConfidenceLevel(self.confidence_level));
        }
        if !positive(self.sd_fraction_threshold) {
            return Err(ConfigError::SdFractionThreshold(self.sd_fraction_threshold));
        }
        if self.number_actions_per_call == 0 {
            return Err(ConfigError::NumberActionsPerCall);
        }
        if self.bootstrap_resamples == 0 {
            return Err(ConfigError::BootstrapResamples);
        }
        Ok(())
    }

    // ─── Setters ─────────────────────────────────────────────────────────────

    /// Measure per-thread CPU time instead of elapsed time
    pub fn with_cpu_time(mut self, enabled: bool) -> Self {
        self.measure_cpu_time = enabled;
        self
    }

    /// `false` runs the task once and reports only that single duration
    pub fn with_many_executions(mut self, enabled: bool) -> Self {
        self.many_executions = enabled;
        self
    }

    /// Set the warmup duration; must be positive
    pub fn with_warmup_seconds(mut self, seconds: f64) -> Result<Self, ConfigError> {
        if !positive(seconds) {
            return Err(ConfigError::WarmupSeconds(seconds));
        }
        self.warmup_seconds = seconds;
        Ok(self)
    }

    /// Set the minimum block duration; must be positive
    pub fn with_execution_time_goal(mut self, seconds: f64) -> Result<Self, ConfigError> {
        if !positive(seconds) {
            return Err(ConfigError::ExecutionTimeGoal(seconds));
        }
        self.execution_time_goal_seconds = seconds;
        Ok(self)
    }

    /// Set how many blocks are measured; must be at least 1
    pub fn with_number_measurements(mut self, count: usize) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::NumberMeasurements);
        }
        self.number_measurements = count;
        Ok(self)
    }

    /// Set the cleanup share of measured time that raises an issue
    pub fn with_cleanup_fraction_threshold(mut self, fraction: f64) -> Result<Self, ConfigError> {
        if !positive(fraction) {
            return Err(ConfigError::CleanupFractionThreshold(fraction));
        }
        self.cleanup_fraction_threshold = fraction;
        Ok(self)
    }

    /// Set the interval confidence level, strictly between 0 and 1
    pub fn with_confidence_level(mut self, level: f64) -> Result<Self, ConfigError> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ConfigError::ConfidenceLevel(level));
        }
        self.confidence_level = level;
        Ok(self)
    }

    /// Benchmark a fixed probe task first and compare its sd to the task's
    pub fn with_noise_floor(mut self, enabled: bool) -> Self {
        self.estimate_noise_floor = enabled;
        self
    }

    /// Set the noise share of the sd that raises an issue
    pub fn with_sd_fraction_threshold(mut self, fraction: f64) -> Result<Self, ConfigError> {
        if !positive(fraction) {
            return Err(ConfigError::SdFractionThreshold(fraction));
        }
        self.sd_fraction_threshold = fraction;
        Ok(self)
    }

    /// Number of logical actions one task call performs
    pub fn with_actions_per_call(mut self, actions: u64) -> Result<Self, ConfigError> {
        if actions == 0 {
            return Err(ConfigError::NumberActionsPerCall);
        }
        self.number_actions_per_call = actions;
        Ok(self)
    }

    /// Set the bootstrap resample count; must be positive
    pub fn with_bootstrap_resamples(mut self, resamples: usize) -> Result<Self, ConfigError> {
        if resamples == 0 {
            return Err(ConfigError::BootstrapResamples);
        }
        self.bootstrap_resamples = resamples;
        Ok(self)
    }

    /// Give up after this many runtime-regime restarts. `None` retries forever.
    pub fn with_max_regime_retries(mut self, retries: Option<u32>) -> Self {
        self.max_regime_retries = retries;
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    /// Whether blocks are timed with per-thread CPU time
    pub fn measure_cpu_time(&self) -> bool {
        self.measure_cpu_time
    }

    /// Statistical mode when true, single-shot otherwise
    pub fn many_executions(&self) -> bool {
        self.many_executions
    }

    /// Warmup duration in seconds
    pub fn warmup_seconds(&self) -> f64 {
        self.warmup_seconds
    }

    /// Minimum block duration in seconds
    pub fn execution_time_goal_seconds(&self) -> f64 {
        self.execution_time_goal_seconds
    }

    /// Number of measured blocks
    pub fn number_measurements(&self) -> usize {
        self.number_measurements
    }

    /// Cleanup issue threshold
    pub fn cleanup_fraction_threshold(&self) -> f64 {
        self.cleanup_fraction_threshold
    }

    /// Interval confidence level
    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    /// Whether the noise floor is estimated
    pub fn estimate_noise_floor(&self) -> bool {
        self.estimate_noise_floor
    }

    /// sd validity issue threshold
    pub fn sd_fraction_threshold(&self) -> f64 {
        self.sd_fraction_threshold
    }

    /// Actions one task call performs
    pub fn number_actions_per_call(&self) -> u64 {
        self.number_actions_per_call
    }

    /// Bootstrap resample count
    pub fn bootstrap_resamples(&self) -> usize {
        self.bootstrap_resamples
    }

    /// Regime restarts allowed before giving up, `None` for no limit
    pub fn max_regime_retries(&self) -> Option<u32> {
        self.max_regime_retries
    }

    /// Bootstrap settings derived from this config
    pub fn bootstrap(&self) -> BootstrapConfig {
        BootstrapConfig {
            resamples: self.bootstrap_resamples,
            confidence_level: self.confidence_level,
            ..BootstrapConfig::default()
        }
    }

    /// Config used to benchmark the noise probe for a task run with `self`
    pub(crate) fn noise_probe_config(&self) -> Self {
        Self {
            many_executions: true,
            estimate_noise_floor: false,
            number_actions_per_call: 1,
            ..self.clone()
        }
    }

    fn key(&self) -> ConfigKey {
        (
            self.measure_cpu_time,
            self.many_executions,
            self.warmup_seconds.to_bits(),
            self.execution_time_goal_seconds.to_bits(),
            self.number_measurements,
            self.cleanup_fraction_threshold.to_bits(),
            self.confidence_level.to_bits(),
            self.estimate_noise_floor,
            self.sd_fraction_threshold.to_bits(),
            self.number_actions_per_call,
            self.bootstrap_resamples,
            self.max_regime_retries,
        )
    }
}

impl PartialEq for BenchmarkConfig {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for BenchmarkConfig {}

impl Hash for BenchmarkConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_defaults_are_valid() {
        let config = BenchmarkConfig::default();
        config.validate().unwrap();
        assert_eq!(config.number_measurements(), 60);
        assert_eq!(config.warmup_seconds(), 10.0);
        assert!(config.many_executions());
        assert!(!config.estimate_noise_floor());
        assert_eq!(config.max_regime_retries(), None);

        BenchmarkConfig::quick().validate().unwrap();
    }

    #[test]
    fn test_setters_reject_bad_values() {
        let config = BenchmarkConfig::default();
        assert_eq!(
            config.clone().with_warmup_seconds(0.0).unwrap_err(),
            ConfigError::WarmupSeconds(0.0)
        );
        assert!(config.clone().with_execution_time_goal(f64::NAN).is_err());
        assert!(config.clone().with_number_measurements(0).is_err());
        assert!(config.clone().with_confidence_level(1.0).is_err());
        assert!(config.clone().with_confidence_level(0.0).is_err());
        assert!(config.clone().with_actions_per_call(0).is_err());
        assert!(config.clone().with_sd_fraction_threshold(-0.1).is_err());
        assert!(config.clone().with_cleanup_fraction_threshold(f64::INFINITY).is_err());
        assert!(config.with_bootstrap_resamples(0).is_err());
    }

    #[test]
    fn test_hash_and_eq_follow_values() {
        let a = BenchmarkConfig::quick();
        let b = BenchmarkConfig::quick();
        let c = BenchmarkConfig::quick().with_cpu_time(true);

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn test_noise_probe_config() {
        let config = BenchmarkConfig::quick()
            .with_noise_floor(true)
            .with_actions_per_call(10)
            .unwrap();
        let probe = config.noise_probe_config();

        assert!(!probe.estimate_noise_floor());
        assert_eq!(probe.number_actions_per_call(), 1);
        assert_eq!(probe.number_measurements(), config.number_measurements());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BenchmarkConfig =
            serde_json::from_str(r#"{"number_measurements": 5, "confidence_level": 0.99}"#)
                .unwrap();
        config.validate().unwrap();
        assert_eq!(config.number_measurements(), 5);
        assert_eq!(config.warmup_seconds(), 10.0);

        let bad: BenchmarkConfig =
            serde_json::from_str(r#"{"confidence_level": 2.0}"#).unwrap();
        assert!(bad.validate().is_err());
    }
}
