//! Benchmark Orchestration
//!
//! Drives one task through the measurement protocol:
//!
//! ```text
//! prepare -> first call -> warmup -> calibrate n -> collect N blocks
//!         -> cleanup check -> diagnostics + statistics -> validate
//! ```
//!
//! Calibration doubles the repetition count until one block of `n` calls
//! lasts longer than the execution time goal. Collection then times
//! `number_measurements` blocks of that size. If the runtime snapshot
//! changes at any point during calibration or collection the affected step
//! starts over, since samples from two regimes must not be mixed.

use crate::clock::ClockSource;
use crate::config::BenchmarkConfig;
use crate::diagnostics::{outlier_issues, serial_correlation_issues};
use crate::error::{BenchError, TaskError};
use crate::estimator::StatisticsEstimator;
use crate::measure::TaskMeasurer;
use crate::noise::{NoiseFloorCache, noise_probe};
use crate::result::{BenchmarkResult, render_output};
use crate::runtime::{NativeRuntime, RuntimeProbe, RuntimeSnapshot};
use crate::stats::Stats;
use crate::status::{NoStatus, StatusGuard, StatusSink};
use statbench_report::format_seconds;
use std::convert::Infallible;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A configured benchmark, ready to run tasks
#[derive(Clone)]
pub struct Benchmark {
    config: BenchmarkConfig,
    runtime: Arc<dyn RuntimeProbe>,
    status: Arc<dyn StatusSink>,
    noise_cache: Arc<NoiseFloorCache>,
    label: String,
    is_noise_probe: bool,
}

impl Benchmark {
    /// Benchmark with the native runtime probe, no status output and a
    /// private noise-floor cache
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            runtime: Arc::new(NativeRuntime::new()),
            status: Arc::new(NoStatus),
            noise_cache: Arc::new(NoiseFloorCache::new()),
            label: "task".to_string(),
            is_noise_probe: false,
        }
    }

    /// Replace the runtime probe
    pub fn with_runtime(mut self, runtime: Arc<dyn RuntimeProbe>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Send progress text to `status`
    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    /// Share a noise-floor cache with other benchmarks
    pub fn with_noise_cache(mut self, cache: Arc<NoiseFloorCache>) -> Self {
        self.noise_cache = cache;
        self
    }

    /// Name shown in status text and log spans
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Configuration every run uses
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Name shown in status text and logs
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Benchmark an infallible task
    pub fn run<T, F>(&self, mut task: F) -> Result<BenchmarkResult, BenchError>
    where
        F: FnMut() -> T,
        T: Debug,
    {
        self.try_run(move || Ok::<T, Infallible>(task()))
    }

    /// Benchmark a task that may fail. The first error aborts the run.
    pub fn try_run<T, E, F>(&self, task: F) -> Result<BenchmarkResult, BenchError>
    where
        F: FnMut() -> Result<T, E>,
        E: Into<TaskError>,
        T: Debug,
    {
        self.config.validate()?;

        let span = tracing::info_span!("benchmark", task = %self.label);
        let _enter = span.enter();
        let status = StatusGuard::new(self.status.as_ref());
        let clock = ClockSource::for_cpu_time(self.config.measure_cpu_time());
        let runtime = self.runtime.as_ref();

        status.set(&format!("{}: preparing runtime", self.label));
        if let Err(e) = runtime.prepare() {
            warn!(error = %e, "runtime preparation failed, continuing without it");
        }

        let mut measurer = TaskMeasurer::new(task, clock, runtime);

        status.set(&format!("{}: first execution", self.label));
        runtime.force_cleanup();
        let first_seconds = measurer.measure(1)?.duration_seconds;
        debug!(first = %format_seconds(first_seconds), clock = clock.name(), "first execution");

        if !self.config.many_executions() {
            let mut result = BenchmarkResult::single_shot(
                self.config.clone(),
                clock,
                first_seconds,
                measurer.last_output().map(render_output),
            );
            status.set(&format!("{}: cleanup check", self.label));
            result.cleanup_issues = self.cleanup_check(clock, first_seconds)?;
            result.validate()?;
            return Ok(result);
        }

        let mut regime = RegimeTracker::new(self.config.max_regime_retries());

        self.warmup(&mut measurer, &status)?;
        let reps = self.calibrate(&mut measurer, &status, &mut regime)?;
        let durations = self.collect(&mut measurer, reps, &status, &mut regime)?;

        status.set(&format!("{}: cleanup check", self.label));
        let total: f64 = durations.iter().sum();
        let cleanup_issues = self.cleanup_check(clock, total)?;

        status.set(&format!("{}: outlier diagnostics", self.label));
        let outlier_issues = outlier_issues(&durations);
        status.set(&format!("{}: serial correlation diagnostics", self.label));
        let serial_issues = serial_correlation_issues(&durations);

        status.set(&format!("{}: bootstrapping statistics", self.label));
        let estimator = StatisticsEstimator::new(&self.config);
        let mut block = estimator.block_stats(&durations)?;
        let mut noise_floor = None;
        if !self.is_noise_probe {
            if self.config.estimate_noise_floor() {
                noise_floor = Some(self.noise_floor()?);
            }
            let issue = estimator.sd_validity(&block, noise_floor.as_ref());
            block = block.with_sd_issues(issue)?;
        }

        let reps_u64 = u64::try_from(reps).map_err(|_| BenchError::InvalidRepetitions(reps))?;
        let actions = reps_u64
            .checked_mul(self.config.number_actions_per_call())
            .ok_or(BenchError::RepetitionOverflow(reps))?;
        let action = block.for_actions(actions)?;

        let result = BenchmarkResult {
            config: self.config.clone(),
            clock,
            first_seconds,
            repetitions_per_block: reps_u64,
            durations,
            block: Some(block),
            action: Some(action),
            noise_floor,
            cleanup_issues,
            outlier_issues,
            serial_issues,
            regime_restarts: regime.restarts,
            last_output: measurer.last_output().map(render_output),
        };
        result.validate()?;

        debug!(summary = %result.summary(), "benchmark complete");
        Ok(result)
    }

    /// Run the task in doubling blocks until the elapsed wall time reaches
    /// the warmup target. Wall time is used whatever the configured clock,
    /// so tasks that sleep or block still warm up in bounded time. Nothing
    /// is kept.
    fn warmup<T, E, F>(
        &self,
        measurer: &mut TaskMeasurer<'_, T, F>,
        status: &StatusGuard<'_>,
    ) -> Result<(), BenchError>
    where
        F: FnMut() -> Result<T, E>,
        E: Into<TaskError>,
    {
        self.runtime.force_cleanup();
        let target = self.config.warmup_seconds();
        let wall = ClockSource::Elapsed;
        let start = wall.now();
        let mut elapsed = 0.0;
        let mut n: i64 = 1;
        let mut calls: i64 = 0;

        while elapsed < target {
            measurer.measure(n)?;
            calls = calls.saturating_add(n);
            elapsed = ClockSource::elapsed_seconds(start, wall.now())?;
            status.set(&format!(
                "{}: warmup {} of {}",
                self.label,
                format_seconds(elapsed),
                format_seconds(target)
            ));
            if elapsed < target {
                n = n.checked_mul(2).ok_or(BenchError::RepetitionOverflow(n))?;
            }
        }

        debug!(calls, wall = %format_seconds(elapsed), "warmup complete");
        Ok(())
    }

    /// Find the smallest power-of-two repetition count whose block exceeds
    /// the execution time goal within one runtime regime
    fn calibrate<T, E, F>(
        &self,
        measurer: &mut TaskMeasurer<'_, T, F>,
        status: &StatusGuard<'_>,
        regime: &mut RegimeTracker,
    ) -> Result<i64, BenchError>
    where
        F: FnMut() -> Result<T, E>,
        E: Into<TaskError>,
    {
        self.runtime.force_cleanup();
        let goal = self.config.execution_time_goal_seconds();
        let mut baseline = self.runtime.snapshot();
        let mut n: i64 = 1;

        loop {
            status.set(&format!("{}: calibrating, trying n = {}", self.label, n));
            let m = measurer.measure(n)?;
            if m.duration_seconds <= goal {
                n = n.checked_mul(2).ok_or(BenchError::RepetitionOverflow(n))?;
                baseline = m.snapshot;
            } else if m.snapshot != baseline {
                // same n again, against the new regime
                regime.restart("calibration", &baseline, &m.snapshot)?;
                baseline = m.snapshot;
            } else {
                debug!(
                    n,
                    block = %format_seconds(m.duration_seconds),
                    goal = %format_seconds(goal),
                    "calibrated repetitions per block"
                );
                return Ok(n);
            }
        }
    }

    /// Time `number_measurements` blocks of `reps` calls each, all in one
    /// runtime regime
    fn collect<T, E, F>(
        &self,
        measurer: &mut TaskMeasurer<'_, T, F>,
        reps: i64,
        status: &StatusGuard<'_>,
        regime: &mut RegimeTracker,
    ) -> Result<Vec<f64>, BenchError>
    where
        F: FnMut() -> Result<T, E>,
        E: Into<TaskError>,
    {
        self.runtime.force_cleanup();
        let count = self.config.number_measurements();
        let mut baseline = self.runtime.snapshot();
        let mut durations = Vec::with_capacity(count);

        while durations.len() < count {
            let m = measurer.measure(reps)?;
            if m.snapshot != baseline {
                regime.restart("measurement", &baseline, &m.snapshot)?;
                baseline = m.snapshot;
                durations.clear();
                continue;
            }
            durations.push(m.duration_seconds);
            status.set(&format!(
                "{}: measurement {} of {} (n = {})",
                self.label,
                durations.len(),
                count,
                reps
            ));
        }

        debug!(count, reps, "measurements collected");
        Ok(durations)
    }

    /// Time one forced cleanup and flag it if it is a significant share of
    /// the `measured` seconds
    fn cleanup_check(&self, clock: ClockSource, measured: f64) -> Result<Option<String>, BenchError> {
        let start = clock.now();
        self.runtime.force_cleanup();
        let end = clock.now();
        let cleanup = ClockSource::elapsed_seconds(start, end)?;

        let fraction = if measured > 0.0 {
            cleanup / measured
        } else if cleanup > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        let threshold = self.config.cleanup_fraction_threshold();
        debug!(cleanup = %format_seconds(cleanup), fraction, "cleanup check");

        if fraction <= threshold {
            return Ok(None);
        }
        Ok(Some(format!(
            "a forced cleanup after measuring took {} which is {:.1}% of the {} spent measuring \
             (threshold {:.1}%); the task may leave cleanup work behind that its times do not include",
            format_seconds(cleanup),
            fraction * 100.0,
            format_seconds(measured),
            threshold * 100.0,
        )))
    }

    /// Block statistics of the noise probe for this config, cached
    fn noise_floor(&self) -> Result<Stats, BenchError> {
        self.noise_cache.get_or_try_insert_with(&self.config, || {
            info!("estimating noise floor");
            let probe = Benchmark {
                config: self.config.noise_probe_config(),
                runtime: Arc::clone(&self.runtime),
                status: Arc::clone(&self.status),
                noise_cache: Arc::clone(&self.noise_cache),
                label: format!("{} (noise floor)", self.label),
                is_noise_probe: true,
            };
            let result = probe.run(noise_probe)?;
            result
                .block
                .ok_or_else(|| BenchError::Invariant("noise probe produced no statistics".into()))
        })
    }
}

/// Counts runtime-regime restarts against the optional limit
struct RegimeTracker {
    restarts: u32,
    limit: Option<u32>,
}

impl RegimeTracker {
    fn new(limit: Option<u32>) -> Self {
        Self { restarts: 0, limit }
    }

    fn restart(
        &mut self,
        phase: &'static str,
        before: &RuntimeSnapshot,
        after: &RuntimeSnapshot,
    ) -> Result<(), BenchError> {
        self.restarts = self.restarts.saturating_add(1);
        warn!(
            phase,
            restarts = self.restarts,
            change = %before.diff(after).unwrap_or_default(),
            "runtime changed, restarting"
        );
        match self.limit {
            Some(limit) if self.restarts > limit => Err(BenchError::RegimeUnstable {
                phase,
                retries: self.restarts,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::status::tests::RecordingStatus;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    fn fast_config() -> BenchmarkConfig {
        BenchmarkConfig::default()
            .with_warmup_seconds(0.001)
            .unwrap()
            .with_execution_time_goal(0.0005)
            .unwrap()
            .with_number_measurements(8)
            .unwrap()
            .with_bootstrap_resamples(200)
            .unwrap()
    }

    fn spin() -> u64 {
        (0..200u64).fold(0, |acc, i| acc.wrapping_add(std::hint::black_box(i)))
    }

    /// Probe whose loaded count moves once a given phase is reached.
    ///
    /// Cleanups are forced at the first call, warmup, calibration, collection
    /// and the final check, so `active_from = 3` starts counting snapshots in
    /// calibration and `active_from = 4` in collection. Counting from 1, the
    /// snapshot numbered `change_at` bumps the count, and every later one
    /// does too when `repeat` is set.
    struct ScriptedProbe {
        cleanups: AtomicU32,
        snapshots: AtomicU32,
        loaded: AtomicU64,
        active_from: u32,
        change_at: u32,
        repeat: bool,
    }

    impl ScriptedProbe {
        fn new(active_from: u32, change_at: u32, repeat: bool) -> Self {
            Self {
                cleanups: AtomicU32::new(0),
                snapshots: AtomicU32::new(0),
                loaded: AtomicU64::new(100),
                active_from,
                change_at,
                repeat,
            }
        }

        fn snapshots_taken(&self) -> u32 {
            self.snapshots.load(Ordering::SeqCst)
        }
    }

    impl RuntimeProbe for ScriptedProbe {
        fn snapshot(&self) -> RuntimeSnapshot {
            if self.cleanups.load(Ordering::SeqCst) >= self.active_from {
                let k = self.snapshots.fetch_add(1, Ordering::SeqCst) + 1;
                if k == self.change_at || (self.repeat && k > self.change_at) {
                    self.loaded.fetch_add(1, Ordering::SeqCst);
                }
            }
            RuntimeSnapshot {
                units_loaded: self.loaded.load(Ordering::SeqCst),
                units_unloaded: 0,
                compile_time_ms: 0,
            }
        }

        fn force_cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Probe whose forced cleanup takes a fixed time
    struct SlowCleanupProbe(Duration);

    impl RuntimeProbe for SlowCleanupProbe {
        fn snapshot(&self) -> RuntimeSnapshot {
            RuntimeSnapshot::default()
        }

        fn force_cleanup(&self) {
            std::thread::sleep(self.0);
        }
    }

    #[test]
    fn test_statistical_run() {
        let mut calls = 0u64;
        let result = Benchmark::new(fast_config())
            .run(|| {
                calls += 1;
                spin()
            })
            .unwrap();

        assert!(!result.is_single_shot());
        assert_eq!(result.durations().len(), 8);
        assert!(result.repetitions_per_block() >= 1);
        assert!(result.repetitions_per_block().is_power_of_two());
        assert!(calls > 8 * result.repetitions_per_block());
        assert_eq!(result.last_output(), Some(spin().to_string().as_str()));

        let block = result.block_stats().unwrap();
        let action = result.action_stats().unwrap();
        let reps = result.repetitions_per_block() as f64;
        assert!((action.mean() * reps - block.mean()).abs() < 1e-12);
        assert!(
            result
                .sd_issues()
                .is_some_and(|s| s.starts_with("sd validity unknown"))
        );
    }

    #[test]
    fn test_single_shot_runs_once() {
        let mut calls = 0;
        let config = fast_config().with_many_executions(false);
        let result = Benchmark::new(config)
            .run(|| {
                calls += 1;
                "done"
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(result.is_single_shot());
        assert!(result.block_stats().is_none());
        assert!(result.durations().is_empty());
        assert_eq!(result.repetitions_per_block(), 1);
        assert_eq!(result.last_output(), Some("\"done\""));
        assert!(result.first_seconds() >= 0.0);
    }

    #[test]
    fn test_task_error_aborts_and_clears_status() {
        let status = Arc::new(RecordingStatus::default());
        let mut calls = 0;
        let err = Benchmark::new(fast_config())
            .with_status(status.clone())
            .try_run(|| {
                calls += 1;
                if calls > 5 { Err("out of widgets") } else { Ok(calls) }
            })
            .unwrap_err();

        assert!(matches!(err, BenchError::Task(_)));
        assert_eq!(calls, 6);
        assert_eq!(*status.clears.lock().unwrap(), 1);
        assert!(!status.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_regime_change_restarts_collection() {
        // snapshot 1 is the baseline, 2 follows block one, 3 follows block two
        let probe = Arc::new(ScriptedProbe::new(4, 3, false));
        let result = Benchmark::new(fast_config())
            .with_runtime(probe.clone())
            .run(spin)
            .unwrap();

        assert_eq!(result.regime_restarts(), 1);
        assert_eq!(result.durations().len(), 8);
        assert_eq!(probe.loaded.load(Ordering::SeqCst), 101);
    }

    #[test]
    fn test_regime_change_retries_calibration_at_same_n() {
        // snapshot 1 is the calibration baseline, 2 follows the first n = 1 block
        let probe = Arc::new(ScriptedProbe::new(3, 2, false));
        let mut calls = 0u64;
        let result = Benchmark::new(fast_config())
            .with_runtime(probe.clone())
            .run(|| {
                calls += 1;
                std::thread::sleep(Duration::from_millis(1));
            })
            .unwrap();

        assert_eq!(result.regime_restarts(), 1);
        assert_eq!(result.repetitions_per_block(), 1);
        assert_eq!(probe.loaded.load(Ordering::SeqCst), 101);
        // first call, one warmup block, two calibration blocks, eight measurements
        assert_eq!(calls, 12);
    }

    #[test]
    fn test_change_during_short_block_needs_no_retry() {
        let probe = Arc::new(ScriptedProbe::new(3, 2, false));
        let task_probe = Arc::clone(&probe);
        let result = Benchmark::new(fast_config())
            .with_runtime(probe.clone())
            .run(move || {
                // fast until the first calibration block has been snapshotted
                if task_probe.snapshots_taken() >= 2 {
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();

        assert_eq!(result.regime_restarts(), 0);
        assert_eq!(result.repetitions_per_block(), 2);
        assert_eq!(probe.loaded.load(Ordering::SeqCst), 101);
    }

    #[test]
    fn test_expensive_cleanup_is_reported() {
        let probe = Arc::new(SlowCleanupProbe(Duration::from_millis(50)));

        let result = Benchmark::new(fast_config())
            .with_runtime(probe.clone())
            .run(spin)
            .unwrap();
        let issue = result.cleanup_issues().unwrap();
        assert!(issue.starts_with("a forced cleanup after measuring took"), "{issue}");
        assert!(result.summary().contains("WARNING: cleanup"));

        let single = Benchmark::new(fast_config().with_many_executions(false))
            .with_runtime(probe)
            .run(spin)
            .unwrap();
        assert!(single.cleanup_issues().is_some());
        assert!(single.full_report().contains("WARNING (cleanup):"));
    }

    #[test]
    fn test_cheap_cleanup_is_not_reported() {
        let result = Benchmark::new(fast_config().with_many_executions(false))
            .with_runtime(Arc::new(ScriptedProbe::new(4, u32::MAX, false)))
            .run(|| std::thread::sleep(Duration::from_millis(20)))
            .unwrap();
        assert!(result.cleanup_issues().is_none());
    }

    #[test]
    fn test_warmup_counts_wall_time_with_cpu_clock() {
        let config = fast_config()
            .with_cpu_time(true)
            .with_warmup_seconds(0.05)
            .unwrap();
        let bench = Benchmark::new(config);
        let runtime = NativeRuntime::new();
        let mut measurer = TaskMeasurer::new(
            || {
                std::thread::sleep(Duration::from_millis(1));
                Ok::<_, Infallible>(())
            },
            ClockSource::CpuTime,
            &runtime,
        );
        let status = StatusGuard::new(&NoStatus);

        let started = Instant::now();
        bench.warmup(&mut measurer, &status).unwrap();
        let wall = started.elapsed().as_secs_f64();

        // doubling can at most roughly double the target
        assert!(wall >= 0.05, "{wall}");
        assert!(wall < 0.5, "{wall}");
    }

    #[test]
    fn test_unstable_regime_hits_limit() {
        let probe = Arc::new(ScriptedProbe::new(4, 2, true));
        let config = fast_config().with_max_regime_retries(Some(2));
        let err = Benchmark::new(config)
            .with_runtime(probe)
            .run(spin)
            .unwrap_err();

        assert!(matches!(
            err,
            BenchError::RegimeUnstable {
                phase: "measurement",
                retries: 3
            }
        ));
    }

    #[test]
    fn test_noise_floor_is_cached() {
        let cache = Arc::new(NoiseFloorCache::new());
        let config = fast_config().with_noise_floor(true);
        let bench = Benchmark::new(config).with_noise_cache(cache.clone());

        let first = bench.run(spin).unwrap();
        assert_eq!(cache.len(), 1);
        let second = bench.run(spin).unwrap();
        assert_eq!(cache.len(), 1);

        assert_eq!(first.noise_floor(), second.noise_floor());
        assert!(first.noise_floor().is_some());
        assert!(
            first
                .sd_issues()
                .is_none_or(|s| !s.starts_with("sd validity unknown"))
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config: BenchmarkConfig = serde_json::from_str(r#"{"warmup_seconds": -1.0}"#).unwrap();
        let err = Benchmark::new(config).run(spin).unwrap_err();
        assert!(matches!(err, BenchError::Config(ConfigError::WarmupSeconds(_))));
    }

    #[test]
    fn test_regime_tracker_limit() {
        let mut tracker = RegimeTracker::new(Some(1));
        let a = RuntimeSnapshot::default();
        let b = RuntimeSnapshot {
            units_loaded: 1,
            ..a
        };

        tracker.restart("calibration", &a, &b).unwrap();
        assert!(tracker.restart("calibration", &b, &a).is_err());

        let mut unbounded = RegimeTracker::new(None);
        for _ in 0..100 {
            unbounded.restart("measurement", &a, &b).unwrap();
        }
        assert_eq!(unbounded.restarts, 100);
    }
}
