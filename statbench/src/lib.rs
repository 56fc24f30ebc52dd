#![warn(missing_docs)]
//! # statbench
//!
//! Statistical micro-benchmarking for Rust.
//!
//! statbench measures how long a task takes with the statistical care that
//! short, noisy timings need:
//! - **Adaptive calibration**: repetitions per block double until one block outlasts the execution time goal
//! - **Regime-stable sampling**: measurement restarts whenever runtime counters (loaded code, compilation) move
//! - **Bootstrap confidence intervals**: BCa or percentile intervals for the mean and standard deviation
//! - **Per-action statistics**: block statistics scaled to single actions, with an outlier-variance model
//! - **Diagnostics**: Tukey-fence outliers, serial correlation, cleanup cost and an optional noise floor
//!
//! ## Quick Start
//!
//! ```ignore
//! use statbench::prelude::*;
//!
//! let config = BenchmarkConfig::quick().with_actions_per_call(1000)?;
//! let result = Benchmark::new(config).run(|| (0..1000u64).map(std::hint::black_box).sum::<u64>())?;
//!
//! println!("{}", result.summary());
//! println!("{}", result.full_report());
//! ```
//!
//! ## Fallible Tasks
//!
//! ```ignore
//! let result = Benchmark::new(BenchmarkConfig::quick())
//!     .try_run(|| std::fs::metadata("Cargo.toml").map(|m| m.len()))?;
//! ```

// Re-export core types
pub use statbench_core::{
    BenchError, Benchmark, BenchmarkConfig, BenchmarkResult, ClockSource, ConfigError,
    ConsoleStatus, Measurement, NativeRuntime, NoStatus, NoiseFloorCache, RuntimeProbe,
    RuntimeSnapshot, Stats, StatsError, StatisticsEstimator, StatusSink, TaskError, TaskMeasurer,
    noise_probe, outlier_issues, serial_correlation_issues,
};

// Re-export report types
pub use statbench_report::{
    BenchmarkEntry, OutputFormat, Report, format_engineering, format_seconds,
    generate_json_report,
};

// Re-export stats
pub use statbench_stats::{BootstrapConfig, Estimate, Statistic, estimate};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchError, Benchmark, BenchmarkConfig, BenchmarkResult, ConsoleStatus, NoiseFloorCache,
        Stats,
    };
}

/// Run the statbench CLI.
///
/// Call this from a binary's `main()` to get the `statbench` command line:
/// ```ignore
/// fn main() {
///     statbench::run().unwrap();
/// }
/// ```
pub use statbench_cli::run;
