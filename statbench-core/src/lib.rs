#![warn(missing_docs)]
//! statbench Core - Measurement Protocol
//!
//! This crate runs a task through a full statistical benchmark:
//! - Clock sources (elapsed and per-thread CPU time) with checked differences
//! - Runtime snapshots that detect regime changes mid-measurement
//! - Repetition calibration and block collection
//! - Outlier, serial-correlation, cleanup and sd-validity diagnostics
//! - Bootstrap statistics per block and per action
//!
//! ```ignore
//! use statbench_core::{Benchmark, BenchmarkConfig};
//!
//! let result = Benchmark::new(BenchmarkConfig::quick()).run(|| (0..1000u64).sum::<u64>())?;
//! println!("{}", result.summary());
//! ```

mod benchmark;
mod clock;
mod config;
mod diagnostics;
mod error;
mod estimator;
mod measure;
mod noise;
mod result;
mod runtime;
mod stats;
mod status;

pub use benchmark::Benchmark;
pub use clock::ClockSource;
pub use config::BenchmarkConfig;
pub use diagnostics::{
    MAX_SERIAL_LAG, MIN_OUTLIER_SAMPLES, MIN_SERIAL_SAMPLES, outlier_issues,
    serial_correlation_issues,
};
pub use error::{BenchError, ConfigError, StatsError, TaskError};
pub use estimator::StatisticsEstimator;
pub use measure::{Measurement, TaskMeasurer};
pub use noise::{NoiseFloorCache, noise_probe};
pub use result::{BenchmarkResult, MAX_OUTPUT_CHARS};
pub use runtime::{NativeRuntime, RuntimeProbe, RuntimeSnapshot, pin_to_current_cpu};
pub use stats::Stats;
pub use status::{ConsoleStatus, NoStatus, StatusSink};
