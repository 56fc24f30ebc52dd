#![warn(missing_docs)]
//! statbench Report - Formatting and Output
//!
//! - Engineering-notation formatting used for every duration in a report
//! - Serialisable report schema (metadata, per-task statistics, issues)
//! - JSON output

mod format;
mod json;
mod report;

pub use format::{REPORT_DIGITS, format_engineering, format_seconds, format_seconds_with};
pub use json::{generate_json_report, parse_json_report};
pub use report::{
    BenchmarkEntry, Report, ReportMeta, RunMode, SCHEMA_VERSION, StatsSummary, SystemInfo,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One summary line per task
    Human,
    /// Full multi-section report per task
    Full,
    /// JSON with full schema
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" | "summary" => Ok(OutputFormat::Human),
            "full" | "verbose" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
