//! Clock Sources
//!
//! Timestamps are plain `i64` nanoseconds so they can be subtracted and
//! checked without platform types leaking out. Elapsed time counts from a
//! process-wide origin; CPU time is the calling thread's CPU clock.

use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Which clock a run reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockSource {
    /// Monotonic wall-clock time
    #[default]
    Elapsed,
    /// CPU time consumed by the current thread
    CpuTime,
}

impl ClockSource {
    /// Pick the clock a config asks for
    pub fn for_cpu_time(cpu_time: bool) -> Self {
        if cpu_time {
            ClockSource::CpuTime
        } else {
            ClockSource::Elapsed
        }
    }

    /// Current reading in nanoseconds
    #[inline]
    pub fn now(self) -> i64 {
        match self {
            ClockSource::Elapsed => elapsed_nanos(),
            ClockSource::CpuTime => thread_cpu_nanos().unwrap_or_else(elapsed_nanos),
        }
    }

    /// Seconds between two readings.
    ///
    /// Fails if `start > end` or if the difference does not fit in an `i64`.
    pub fn elapsed_seconds(start: i64, end: i64) -> Result<f64, BenchError> {
        if start > end {
            return Err(BenchError::ClockWentBackwards { start, end });
        }
        let nanos = end
            .checked_sub(start)
            .ok_or(BenchError::DurationOverflow { start, end })?;
        Ok(nanos as f64 * 1e-9)
    }

    /// Short name used in reports ("elapsed" or "cpu")
    pub fn name(self) -> &'static str {
        match self {
            ClockSource::Elapsed => "elapsed",
            ClockSource::CpuTime => "cpu",
        }
    }
}

#[inline]
fn elapsed_nanos() -> i64 {
    let origin = ORIGIN.get_or_init(Instant::now);
    i64::try_from(origin.elapsed().as_nanos()).unwrap_or(i64::MAX)
}

#[cfg(unix)]
#[inline]
fn thread_cpu_nanos() -> Option<i64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        warn_cpu_clock_unavailable();
        return None;
    }
    i64::from(ts.tv_sec)
        .checked_mul(1_000_000_000)?
        .checked_add(i64::from(ts.tv_nsec))
}

#[cfg(not(unix))]
#[inline]
fn thread_cpu_nanos() -> Option<i64> {
    warn_cpu_clock_unavailable();
    None
}

fn warn_cpu_clock_unavailable() {
    static WARNED: OnceLock<()> = OnceLock::new();
    WARNED.get_or_init(|| {
        tracing::warn!("thread CPU clock unavailable, falling back to elapsed time");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_elapsed_is_monotonic() {
        let a = ClockSource::Elapsed.now();
        std::thread::sleep(Duration::from_millis(10));
        let b = ClockSource::Elapsed.now();

        let secs = ClockSource::elapsed_seconds(a, b).unwrap();
        assert!(secs >= 0.005, "slept 10ms, measured {secs}");
        assert!(secs < 1.0);
    }

    #[test]
    fn test_cpu_time_ignores_sleep() {
        let clock = ClockSource::CpuTime;
        let a = clock.now();
        std::thread::sleep(Duration::from_millis(50));
        let b = clock.now();

        let secs = ClockSource::elapsed_seconds(a, b).unwrap();
        assert!(secs < 0.04, "sleep should not burn CPU time, got {secs}");
    }

    #[test]
    fn test_elapsed_seconds_errors() {
        assert!(matches!(
            ClockSource::elapsed_seconds(10, 5),
            Err(BenchError::ClockWentBackwards { start: 10, end: 5 })
        ));
        assert!(matches!(
            ClockSource::elapsed_seconds(i64::MIN, i64::MAX),
            Err(BenchError::DurationOverflow { .. })
        ));
        assert_eq!(ClockSource::elapsed_seconds(7, 7).unwrap(), 0.0);
        assert!((ClockSource::elapsed_seconds(-500, 1_499_999_500).unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_for_cpu_time() {
        assert_eq!(ClockSource::for_cpu_time(true), ClockSource::CpuTime);
        assert_eq!(ClockSource::for_cpu_time(false), ClockSource::Elapsed);
    }
}
