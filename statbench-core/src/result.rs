//! Benchmark Results
//!
//! Everything a run produced: the first-execution time, per-block and
//! per-action statistics, advisory issues, and renderings of all of it.

use crate::clock::ClockSource;
use crate::config::BenchmarkConfig;
use crate::error::BenchError;
use crate::stats::Stats;
use statbench_report::{BenchmarkEntry, RunMode, format_seconds};

const SEPARATOR: &str =
    "--------------------------------------------------------------------------------";

/// Longest rendering of the task's last output kept in a result
pub const MAX_OUTPUT_CHARS: usize = 200;

/// Outcome of a benchmark run
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub(crate) config: BenchmarkConfig,
    pub(crate) clock: ClockSource,
    pub(crate) first_seconds: f64,
    pub(crate) repetitions_per_block: u64,
    pub(crate) durations: Vec<f64>,
    pub(crate) block: Option<Stats>,
    pub(crate) action: Option<Stats>,
    pub(crate) noise_floor: Option<Stats>,
    pub(crate) cleanup_issues: Option<String>,
    pub(crate) outlier_issues: Option<String>,
    pub(crate) serial_issues: Option<String>,
    pub(crate) regime_restarts: u32,
    pub(crate) last_output: Option<String>,
}

impl BenchmarkResult {
    /// Result of a run that executed the task exactly once
    pub(crate) fn single_shot(
        config: BenchmarkConfig,
        clock: ClockSource,
        first_seconds: f64,
        last_output: Option<String>,
    ) -> Self {
        Self {
            config,
            clock,
            first_seconds,
            repetitions_per_block: 1,
            durations: Vec::new(),
            block: None,
            action: None,
            noise_floor: None,
            cleanup_issues: None,
            outlier_issues: None,
            serial_issues: None,
            regime_restarts: 0,
            last_output,
        }
    }

    /// Configuration the run used
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Clock the durations were measured with
    pub fn clock(&self) -> ClockSource {
        self.clock
    }

    /// Duration of the very first task call, before any warmup
    pub fn first_seconds(&self) -> f64 {
        self.first_seconds
    }

    /// Task calls per measured block
    pub fn repetitions_per_block(&self) -> u64 {
        self.repetitions_per_block
    }

    /// Block durations in measurement order
    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    /// Block statistics, `None` for single-shot runs
    pub fn block_stats(&self) -> Option<&Stats> {
        self.block.as_ref()
    }

    /// Per-action statistics, `None` for single-shot runs
    pub fn action_stats(&self) -> Option<&Stats> {
        self.action.as_ref()
    }

    /// Block statistics of the noise probe, when it was run
    pub fn noise_floor(&self) -> Option<&Stats> {
        self.noise_floor.as_ref()
    }

    /// Cleanup-cost diagnostic
    pub fn cleanup_issues(&self) -> Option<&str> {
        self.cleanup_issues.as_deref()
    }

    /// Outlier diagnostic
    pub fn outlier_issues(&self) -> Option<&str> {
        self.outlier_issues.as_deref()
    }

    /// Serial-correlation diagnostic
    pub fn serial_issues(&self) -> Option<&str> {
        self.serial_issues.as_deref()
    }

    /// sd validity and outlier-variance diagnostics of the action statistics
    pub fn sd_issues(&self) -> Option<&str> {
        self.action.as_ref().and_then(Stats::sd_issues)
    }

    /// Times measurement restarted because the runtime regime changed
    pub fn regime_restarts(&self) -> u32 {
        self.regime_restarts
    }

    /// `Debug` rendering of the task's last output
    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    /// Whether the task ran only once
    pub fn is_single_shot(&self) -> bool {
        self.block.is_none()
    }

    fn labelled_issues(&self) -> Vec<(&'static str, &str)> {
        [
            ("cleanup", self.cleanup_issues()),
            ("outliers", self.outlier_issues()),
            ("serial correlation", self.serial_issues()),
            ("sd", self.sd_issues()),
        ]
        .into_iter()
        .filter_map(|(label, issue)| issue.map(|text| (label, text)))
        .collect()
    }

    /// All issue texts, in report order
    pub fn issues(&self) -> Vec<&str> {
        self.labelled_issues().into_iter().map(|(_, t)| t).collect()
    }

    /// Whether any diagnostic fired
    pub fn has_issues(&self) -> bool {
        !self.labelled_issues().is_empty()
    }

    /// One-line summary of the action statistics.
    ///
    /// `first = ..., mean = ... (CI deltas: ...), sd = ... (CI deltas: ...)`
    /// followed by ` WARNING: ...` naming each kind of issue found.
    pub fn summary(&self) -> String {
        let mut line = format!("first = {}", format_seconds(self.first_seconds));
        if let Some(action) = &self.action {
            line.push_str(", ");
            line.push_str(&action.describe());
        }
        let labels: Vec<&str> = self.labelled_issues().into_iter().map(|(l, _)| l).collect();
        if !labels.is_empty() {
            line.push_str(" WARNING: ");
            line.push_str(&labels.join(", "));
        }
        line
    }

    /// Multi-section report with every statistic and the full issue texts.
    ///
    /// Sections are divided by separator lines; there is no trailing newline.
    pub fn full_report(&self) -> String {
        let mut sections = vec![format!(
            "first execution ({} clock): {}",
            self.clock.name(),
            format_seconds(self.first_seconds)
        )];

        if let (Some(block), Some(action)) = (&self.block, &self.action) {
            let actions = self.actions_per_block();
            let mut stats = format!(
                "block statistics ({} measurements of {} execution(s), {:.0}% confidence intervals):\n  {}",
                self.durations.len(),
                self.repetitions_per_block,
                self.config.confidence_level() * 100.0,
                block.describe(),
            );
            stats.push_str(&format!(
                "\naction statistics ({actions} action(s) per block):\n  {}",
                action.describe()
            ));
            if let Some(noise) = &self.noise_floor {
                stats.push_str(&format!("\nnoise floor block statistics:\n  {}", noise.describe()));
            }
            if self.regime_restarts > 0 {
                stats.push_str(&format!(
                    "\nmeasurement restarted {} time(s) after runtime changes",
                    self.regime_restarts
                ));
            }
            sections.push(stats);
        }

        let issues = self.labelled_issues();
        if !issues.is_empty() {
            let text: Vec<String> = issues
                .into_iter()
                .map(|(label, issue)| format!("WARNING ({label}):\n  {}", indent(issue)))
                .collect();
            sections.push(text.join("\n"));
        } else if !self.is_single_shot() {
            sections.push("no issues detected".to_string());
        }

        if let Some(output) = &self.last_output {
            sections.push(format!("last task output: {output}"));
        }

        sections.join(&format!("\n{SEPARATOR}\n"))
    }

    /// Serializable entry for machine-readable reports
    pub fn to_report_entry(&self, name: &str) -> BenchmarkEntry {
        let level = self.config.confidence_level();
        BenchmarkEntry {
            name: name.to_string(),
            mode: if self.is_single_shot() {
                RunMode::SingleShot
            } else {
                RunMode::Statistical
            },
            first_seconds: self.first_seconds,
            repetitions_per_block: self.repetitions_per_block,
            actions_per_call: self.config.number_actions_per_call(),
            measurements: self.durations.len(),
            block: self.block.as_ref().map(|s| s.to_summary(level)),
            action: self.action.as_ref().map(|s| s.to_summary(level)),
            summary: self.summary(),
            issues: self.issues().into_iter().map(str::to_string).collect(),
            last_output: self.last_output.clone(),
        }
    }

    fn actions_per_block(&self) -> u64 {
        self.repetitions_per_block
            .saturating_mul(self.config.number_actions_per_call())
    }

    /// Check the result is internally consistent before handing it out
    pub(crate) fn validate(&self) -> Result<(), BenchError> {
        let fail = |what: String| Err(BenchError::Invariant(what));

        if !(self.first_seconds.is_finite() && self.first_seconds >= 0.0) {
            return fail(format!("first duration {} is not a valid time", self.first_seconds));
        }
        if self.repetitions_per_block == 0 {
            return fail("zero repetitions per block".to_string());
        }
        for issue in self.issues() {
            if issue.trim().is_empty() {
                return fail("blank issue text".to_string());
            }
        }

        if !self.config.many_executions() {
            return match (&self.block, &self.action) {
                (None, None) => Ok(()),
                _ => fail("single-shot run carries statistics".to_string()),
            };
        }

        if self.durations.len() != self.config.number_measurements() {
            return fail(format!(
                "{} measurements collected, {} configured",
                self.durations.len(),
                self.config.number_measurements()
            ));
        }
        if let Some(bad) = self.durations.iter().find(|d| !(d.is_finite() && **d >= 0.0)) {
            return fail(format!("block duration {bad} is not a valid time"));
        }
        if self.block.is_none() || self.action.is_none() {
            return fail("statistical run is missing statistics".to_string());
        }
        Ok(())
    }
}

fn indent(text: &str) -> String {
    text.replace('\n', "\n  ")
}

/// Render an output for display, truncated to [`MAX_OUTPUT_CHARS`]
pub(crate) fn render_output<T: std::fmt::Debug>(output: &T) -> String {
    let text = format!("{output:?}");
    if text.chars().count() <= MAX_OUTPUT_CHARS {
        return text;
    }
    let mut truncated: String = text.chars().take(MAX_OUTPUT_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statistical() -> BenchmarkResult {
        let config = BenchmarkConfig::quick()
            .with_number_measurements(3)
            .unwrap()
            .with_actions_per_call(10)
            .unwrap();
        let block = Stats::new(0.1, 0.09, 0.11, 0.01, 0.008, 0.012, None).unwrap();
        let action = block.for_actions(10).unwrap();

        BenchmarkResult {
            config,
            clock: ClockSource::Elapsed,
            first_seconds: 0.012,
            repetitions_per_block: 1,
            durations: vec![0.1, 0.09, 0.11],
            block: Some(block),
            action: Some(action),
            noise_floor: None,
            cleanup_issues: None,
            outlier_issues: None,
            serial_issues: None,
            regime_restarts: 0,
            last_output: Some("42".to_string()),
        }
    }

    #[test]
    fn test_summary_without_issues() {
        let result = statistical();
        let summary = result.summary();

        assert!(summary.starts_with("first = 12.0 ms, mean = 10.0 ms (CI deltas: -"), "{summary}");
        assert!(!summary.contains("WARNING"));
        assert!(!result.has_issues());
    }

    #[test]
    fn test_summary_lists_issue_kinds() {
        let mut result = statistical();
        result.outlier_issues = Some("2 of 3 measurements are outliers".into());
        result.serial_issues = Some("unable to determine serial correlation".into());

        assert!(result.summary().ends_with(" WARNING: outliers, serial correlation"));
        assert_eq!(result.issues().len(), 2);
    }

    #[test]
    fn test_full_report_sections() {
        let mut result = statistical();
        result.cleanup_issues = Some("cleanup is expensive\nsecond line".into());
        let report = result.full_report();

        assert!(report.starts_with("first execution (elapsed clock): 12.0 ms"));
        assert!(report.contains("block statistics (3 measurements of 1 execution(s), 95% confidence intervals)"));
        assert!(report.contains("action statistics (10 action(s) per block)"));
        assert!(report.contains("WARNING (cleanup):\n  cleanup is expensive\n  second line"));
        assert!(report.ends_with("last task output: 42"));
        assert!(!report.ends_with('\n'));
        assert_eq!(report.matches(SEPARATOR).count(), 3);
    }

    #[test]
    fn test_single_shot_rendering() {
        let result = BenchmarkResult::single_shot(
            BenchmarkConfig::quick().with_many_executions(false),
            ClockSource::Elapsed,
            0.5,
            None,
        );

        assert_eq!(result.summary(), "first = 500 ms");
        assert_eq!(result.full_report(), "first execution (elapsed clock): 500 ms");
        result.validate().unwrap();

        let entry = result.to_report_entry("once");
        assert_eq!(entry.mode, RunMode::SingleShot);
        assert!(entry.block.is_none());
    }

    #[test]
    fn test_single_shot_report_keeps_issue_text() {
        let mut result = BenchmarkResult::single_shot(
            BenchmarkConfig::quick().with_many_executions(false),
            ClockSource::Elapsed,
            0.5,
            Some("7".to_string()),
        );
        result.cleanup_issues = Some("a forced cleanup took 300 ms".into());

        assert_eq!(result.summary(), "first = 500 ms WARNING: cleanup");
        let report = result.full_report();
        assert!(
            report.contains("WARNING (cleanup):\n  a forced cleanup took 300 ms"),
            "{report}"
        );
        assert!(report.ends_with("last task output: 7"));
        assert_eq!(report.matches(SEPARATOR).count(), 2);
    }

    #[test]
    fn test_report_entry() {
        let entry = statistical().to_report_entry("sleep");

        assert_eq!(entry.name, "sleep");
        assert_eq!(entry.mode, RunMode::Statistical);
        assert_eq!(entry.measurements, 3);
        assert_eq!(entry.actions_per_call, 10);
        assert!((entry.action.unwrap().mean - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_validate_catches_inconsistency() {
        let mut result = statistical();
        result.validate().unwrap();

        result.durations.pop();
        assert!(matches!(result.validate(), Err(BenchError::Invariant(_))));

        let mut result = statistical();
        result.first_seconds = f64::NAN;
        assert!(result.validate().is_err());
    }

    #[test]
    fn test_render_output_truncates() {
        assert_eq!(render_output(&vec![1, 2]), "[1, 2]");
        let long = "x".repeat(500);
        let rendered = render_output(&long);
        assert_eq!(rendered.chars().count(), MAX_OUTPUT_CHARS + 3);
    }
}
