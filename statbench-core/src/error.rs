//! Error Types
//!
//! Hard failures only. Statistical concerns (outliers, serial correlation,
//! inflated sd, cleanup cost) are advisory strings on a successful
//! [`BenchmarkResult`](crate::BenchmarkResult) and never appear here.

use statbench_stats::BootstrapError;
use thiserror::Error;

/// Boxed error raised by the task under measurement
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid configuration value, rejected when it is set
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `warmup_seconds` not finite and positive
    #[error("warmup_seconds must be finite and > 0, got {0}")]
    WarmupSeconds(f64),

    /// `execution_time_goal_seconds` not finite and positive
    #[error("execution_time_goal_seconds must be finite and > 0, got {0}")]
    ExecutionTimeGoal(f64),

    /// `number_measurements` is zero
    #[error("number_measurements must be > 0")]
    NumberMeasurements,

    /// `cleanup_fraction_threshold` not finite and positive
    #[error("cleanup_fraction_threshold must be finite and > 0, got {0}")]
    CleanupFractionThreshold(f64),

    /// `confidence_level` outside (0, 1)
    #[error("confidence_level must lie strictly between 0 and 1, got {0}")]
    ConfidenceLevel(f64),

    /// `sd_fraction_threshold` not finite and positive
    #[error("sd_fraction_threshold must be finite and > 0, got {0}")]
    SdFractionThreshold(f64),

    /// `number_actions_per_call` is zero
    #[error("number_actions_per_call must be > 0")]
    NumberActionsPerCall,

    /// `bootstrap_resamples` is zero
    #[error("bootstrap_resamples must be > 0")]
    BootstrapResamples,
}

/// `Stats` construction failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// A statistic is negative, NaN or infinite
    #[error("{field} must be finite and >= 0, got {value}")]
    NotNormal {
        /// Offending field
        field: &'static str,
        /// Rejected value
        value: f64,
    },

    /// Issue text present but blank
    #[error("sd issue text must not be blank")]
    BlankIssue,

    /// Scaling to zero actions
    #[error("action count must be > 0")]
    ZeroActions,
}

/// Benchmark run failure
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// End reading earlier than the start reading
    #[error("clock went backwards: start = {start} ns, end = {end} ns")]
    ClockWentBackwards {
        /// Start reading in ns
        start: i64,
        /// End reading in ns
        end: i64,
    },

    /// Difference of the readings does not fit in an `i64`
    #[error("elapsed time overflowed: start = {start} ns, end = {end} ns")]
    DurationOverflow {
        /// Start reading in ns
        start: i64,
        /// End reading in ns
        end: i64,
    },

    /// Block size of zero or less
    #[error("repetition count must be > 0, got {0}")]
    InvalidRepetitions(i64),

    /// Doubling or scaling the block size overflowed
    #[error("repetition count overflowed while calibrating (last tried {0})")]
    RepetitionOverflow(i64),

    /// The task returned an error
    #[error("task failed: {0}")]
    Task(#[source] TaskError),

    /// Runtime kept changing past `max_regime_retries`
    #[error("runtime never stabilised during {phase}: {retries} restarts")]
    RegimeUnstable {
        /// "calibration" or "measurement"
        phase: &'static str,
        /// Restarts made before giving up
        retries: u32,
    },

    /// Statistics failed validation
    #[error("statistics error: {0}")]
    Stats(#[from] StatsError),

    /// Bootstrap could not run
    #[error("bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// Result failed its consistency check
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
