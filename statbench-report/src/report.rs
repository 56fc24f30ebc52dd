//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version of the JSON report
pub const SCHEMA_VERSION: u32 = 1;

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata
    pub meta: ReportMeta,
    /// One entry per benchmarked task, in run order
    pub results: Vec<BenchmarkEntry>,
}

impl Report {
    /// Empty report stamped with the current time and host
    pub fn new() -> Self {
        Self {
            meta: ReportMeta::collect(),
            results: Vec::new(),
        }
    }

    /// Append one benchmark result
    pub fn push(&mut self, entry: BenchmarkEntry) {
        self.results.push(entry);
    }

    /// Number of results carrying at least one advisory issue
    pub fn warnings(&self) -> usize {
        self.results.iter().filter(|r| !r.issues.is_empty()).count()
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Report schema version
    pub schema_version: u32,
    /// statbench version that produced the report
    pub version: String,
    /// Generation time
    pub timestamp: DateTime<Utc>,
    /// Host the tasks ran on
    pub system: SystemInfo,
}

impl ReportMeta {
    /// Metadata for a report generated now on this host
    pub fn collect() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            system: SystemInfo::collect(),
        }
    }
}

/// Host information
///
/// Linux-specific fields (CPU model, memory) degrade to "Unknown"/0 elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model name
    pub cpu: String,
    /// Available parallelism
    pub cpu_cores: u32,
    /// Total memory in GiB
    pub memory_gb: f64,
}

impl SystemInfo {
    /// Probe the current host
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu: cpu_model().unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1),
            memory_gb: memory_gb().unwrap_or(0.0),
        }
    }
}

fn cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo").ok().and_then(|content| {
            content
                .lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split(':').nth(1))
                .map(|s| s.trim().to_string())
        })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn memory_gb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/meminfo").ok().and_then(|content| {
            content
                .lines()
                .find(|l| l.starts_with("MemTotal"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|s| s.parse::<u64>().ok())
                .map(|kb| kb as f64 / 1024.0 / 1024.0)
        })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Point estimates and confidence bounds, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Mean estimate
    pub mean: f64,
    /// Lower bound of the mean interval
    pub mean_lower: f64,
    /// Upper bound of the mean interval
    pub mean_upper: f64,
    /// Standard deviation estimate
    pub sd: f64,
    /// Lower bound of the sd interval
    pub sd_lower: f64,
    /// Upper bound of the sd interval
    pub sd_upper: f64,
    /// Confidence level of both intervals (e.g. 0.95)
    pub confidence_level: f64,
}

/// One benchmarked task in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    /// Task name
    pub name: String,
    /// Single-shot or statistical
    pub mode: RunMode,
    /// Duration of the first execution in seconds
    pub first_seconds: f64,
    /// Task calls per measured block
    pub repetitions_per_block: u64,
    /// Actions performed by one task call
    pub actions_per_call: u64,
    /// Number of measured blocks
    pub measurements: usize,
    /// Block statistics (statistical mode only)
    pub block: Option<StatsSummary>,
    /// Per-action statistics (statistical mode only)
    pub action: Option<StatsSummary>,
    /// One-line summary as printed by the human formatter
    pub summary: String,
    /// Advisory diagnostics, in protocol order
    pub issues: Vec<String>,
    /// Rendering of the task's last output
    pub last_output: Option<String>,
}

/// Whether the task was timed once or statistically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// The task ran exactly once
    SingleShot,
    /// Repeated blocks with bootstrap statistics
    Statistical,
}
