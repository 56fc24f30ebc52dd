//! Configuration loading from statbench.toml
//!
//! statbench configuration can be specified in a `statbench.toml` file in the
//! project root. The file is discovered by walking up from the current
//! directory; command-line flags override anything it sets.

use serde::{Deserialize, Serialize};
use statbench_core::BenchmarkConfig;
use std::path::Path;

/// Name of the configuration file searched for by [`StatConfig::discover`]
pub const CONFIG_FILE: &str = "statbench.toml";

/// statbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatConfig {
    /// Measurement protocol settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Measurement protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Warmup duration before calibration (e.g., "10s")
    pub warmup_time: String,
    /// Minimum duration of one measured block (e.g., "1s", "50ms")
    pub execution_time_goal: String,
    /// Number of blocks measured
    pub measurements: usize,
    /// Measure per-thread CPU time instead of elapsed time
    pub cpu_time: bool,
    /// `false` runs each task exactly once
    pub many_executions: bool,
    /// Cleanup time, as a fraction of measured time, above which a warning is raised
    pub cleanup_fraction_threshold: f64,
    /// Confidence level of the bootstrap intervals
    pub confidence_level: f64,
    /// Benchmark a probe task to estimate environmental noise
    pub estimate_noise_floor: bool,
    /// Noise share of the sd above which a warning is raised
    pub sd_fraction_threshold: f64,
    /// Actions per task call; overrides each built-in task's own count
    pub actions_per_call: Option<u64>,
    /// Bootstrap resamples
    pub bootstrap_iterations: usize,
    /// Give up after this many runtime-regime restarts
    pub max_regime_retries: Option<u32>,
    /// Pin the measuring thread to its current CPU
    pub pin_cpu: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_time: "10s".to_string(),
            execution_time_goal: "1s".to_string(),
            measurements: 60,
            cpu_time: false,
            many_executions: true,
            cleanup_fraction_threshold: 0.01,
            confidence_level: 0.95,
            estimate_noise_floor: false,
            sd_fraction_threshold: 0.01,
            actions_per_call: None,
            bootstrap_iterations: 10_000,
            max_regime_retries: None,
            pin_cpu: true,
        }
    }
}

impl RunnerConfig {
    /// Validated benchmark config from these settings
    pub fn to_benchmark_config(&self) -> anyhow::Result<BenchmarkConfig> {
        let mut config = BenchmarkConfig::default()
            .with_cpu_time(self.cpu_time)
            .with_many_executions(self.many_executions)
            .with_noise_floor(self.estimate_noise_floor)
            .with_max_regime_retries(self.max_regime_retries)
            .with_warmup_seconds(StatConfig::parse_duration(&self.warmup_time)?)?
            .with_execution_time_goal(StatConfig::parse_duration(&self.execution_time_goal)?)?
            .with_number_measurements(self.measurements)?
            .with_cleanup_fraction_threshold(self.cleanup_fraction_threshold)?
            .with_confidence_level(self.confidence_level)?
            .with_sd_fraction_threshold(self.sd_fraction_threshold)?
            .with_bootstrap_resamples(self.bootstrap_iterations)?;
        if let Some(actions) = self.actions_per_call {
            config = config.with_actions_per_call(actions)?;
        }
        Ok(config)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "full", "json"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl StatConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!(path = %config_path.display(), "loaded configuration");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), error = %e, "ignoring unreadable configuration");
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# statbench configuration

[runner]
# Warmup duration before calibration
warmup_time = "10s"
# Minimum duration of one measured block
execution_time_goal = "1s"
# Number of blocks measured
measurements = 60
# Measure per-thread CPU time instead of elapsed time
cpu_time = false
# Set to false to run each task exactly once
many_executions = true
# Warn when a forced cleanup costs more than this fraction of measured time
cleanup_fraction_threshold = 0.01
# Confidence level of the bootstrap intervals (0.0 to 1.0)
confidence_level = 0.95
# Benchmark a probe task to estimate environmental noise
estimate_noise_floor = false
# Warn when noise may explain more than this fraction of the sd
sd_fraction_threshold = 0.01
# Bootstrap resamples for confidence intervals
bootstrap_iterations = 10000
# Pin the measuring thread to its current CPU (Linux)
pin_cpu = true
# Actions per task call, overriding each task's own count (uncomment to enable)
# actions_per_call = 1
# Give up after this many runtime-regime restarts (uncomment to enable)
# max_regime_retries = 100

[output]
# Default output format: human, full, json
format = "human"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to seconds
    pub fn parse_duration(s: &str) -> anyhow::Result<f64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier = match unit_part.to_lowercase().as_str() {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" | "" => 1.0,
            "m" | "min" => 60.0,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok(value * multiplier)
    }
}
