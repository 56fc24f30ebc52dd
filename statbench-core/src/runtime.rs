//! Runtime Snapshots
//!
//! A benchmark only means something if the process stayed in one execution
//! regime for the whole run. A [`RuntimeProbe`] reports cumulative counters
//! that move when the regime changes: code units being loaded or unloaded,
//! and time spent compiling. Any difference between two snapshots taken
//! around a measurement invalidates it.
//!
//! [`NativeRuntime`] is the default probe for a compiled process. Its code
//! units are shared objects (`dlopen`/`dlclose` bump the loader's counters).
//! Native code never compiles at runtime, so compile time is reported as
//! unsupported. Embedders hosting a JIT or plugin system implement the trait
//! themselves.

use std::fmt;

/// Cumulative runtime counters at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuntimeSnapshot {
    /// Code units loaded so far
    pub units_loaded: u64,
    /// Code units unloaded so far
    pub units_unloaded: u64,
    /// Cumulative compilation time in ms, `-1` when unsupported
    pub compile_time_ms: i64,
}

impl RuntimeSnapshot {
    /// Snapshot for a probe that tracks nothing
    pub const UNSUPPORTED: RuntimeSnapshot = RuntimeSnapshot {
        units_loaded: 0,
        units_unloaded: 0,
        compile_time_ms: -1,
    };

    /// Describe every counter that differs between `self` and `later`.
    ///
    /// Cumulative counters never go down, so a decrease is marked anomalous.
    pub fn diff(&self, later: &RuntimeSnapshot) -> Option<String> {
        let changes: Vec<String> = [
            ("units loaded", self.units_loaded as i128, later.units_loaded as i128, ""),
            ("units unloaded", self.units_unloaded as i128, later.units_unloaded as i128, ""),
            ("compile time", self.compile_time_ms as i128, later.compile_time_ms as i128, " ms"),
        ]
        .into_iter()
        .filter(|(_, before, after, _)| before != after)
        .map(|(name, before, after, unit)| {
            let mut change = format!("{name} {before}{unit} -> {after}{unit}");
            if after < before {
                change.push_str(" (anomalous decrease)");
            }
            change
        })
        .collect();

        (!changes.is_empty()).then(|| changes.join(", "))
    }
}

impl fmt::Display for RuntimeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loaded = {}, unloaded = {}, compile time = ",
            self.units_loaded, self.units_unloaded
        )?;
        if self.compile_time_ms < 0 {
            f.write_str("unsupported")
        } else {
            write!(f, "{} ms", self.compile_time_ms)
        }
    }
}

/// Source of runtime snapshots and cleanup for a benchmark run
pub trait RuntimeProbe: Send + Sync {
    /// Current counters
    fn snapshot(&self) -> RuntimeSnapshot;

    /// Best-effort request to reclaim memory freed by the task.
    ///
    /// Called before measurement starts and once more after the last block
    /// to estimate the cleanup cost a task leaves behind.
    fn force_cleanup(&self) {}

    /// One-time setup before the first measurement. Failure is logged and
    /// the run continues.
    fn prepare(&self) -> Result<(), std::io::Error> {
        Ok(())
    }
}

/// Probe for a natively compiled process
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime {
    pin_thread: bool,
}

impl NativeRuntime {
    /// Native probe without CPU pinning
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the measuring thread to the CPU it is running on in `prepare`
    pub fn with_pinning(mut self, enabled: bool) -> Self {
        self.pin_thread = enabled;
        self
    }
}

impl RuntimeProbe for NativeRuntime {
    fn snapshot(&self) -> RuntimeSnapshot {
        match loader_counters() {
            Some((loaded, unloaded)) => RuntimeSnapshot {
                units_loaded: loaded,
                units_unloaded: unloaded,
                compile_time_ms: -1,
            },
            None => RuntimeSnapshot::UNSUPPORTED,
        }
    }

    fn force_cleanup(&self) {
        trim_heap();
    }

    fn prepare(&self) -> Result<(), std::io::Error> {
        if self.pin_thread {
            pin_to_current_cpu()?;
        }
        Ok(())
    }
}

// ─── Platform helpers ────────────────────────────────────────────────────────

/// Dynamic loader add/remove counters (`dlpi_adds`, `dlpi_subs`)
#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn loader_counters() -> Option<(u64, u64)> {
    unsafe extern "C" fn first_object(
        info: *mut libc::dl_phdr_info,
        _size: libc::size_t,
        data: *mut libc::c_void,
    ) -> libc::c_int {
        // SAFETY: the loader passes a valid `info`; `data` is the tuple below.
        unsafe {
            let out = &mut *(data as *mut (u64, u64));
            out.0 = (*info).dlpi_adds as u64;
            out.1 = (*info).dlpi_subs as u64;
        }
        1
    }

    let mut counters = (0u64, 0u64);
    // SAFETY: the callback only writes through `data`, which outlives the call.
    let rc = unsafe {
        libc::dl_iterate_phdr(
            Some(first_object),
            &mut counters as *mut (u64, u64) as *mut libc::c_void,
        )
    };
    (rc != 0).then_some(counters)
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn loader_counters() -> Option<(u64, u64)> {
    None
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn trim_heap() {
    // SAFETY: malloc_trim has no preconditions.
    unsafe {
        libc::malloc_trim(0);
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn trim_heap() {}

/// Pin the current thread to the CPU it is running on
#[cfg(target_os = "linux")]
pub fn pin_to_current_cpu() -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    // SAFETY: sched_getcpu has no preconditions.
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu < 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: an all-zero cpu_set_t is a valid empty set, `cpu` was just
    // checked to be non-negative, and the set outlives the syscall.
    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu as usize, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// Pinning is unsupported here; always succeeds
#[cfg(not(target_os = "linux"))]
pub fn pin_to_current_cpu() -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_lists_changes() {
        let before = RuntimeSnapshot {
            units_loaded: 10,
            units_unloaded: 0,
            compile_time_ms: 5,
        };
        assert_eq!(before.diff(&before), None);

        let after = RuntimeSnapshot {
            units_loaded: 12,
            units_unloaded: 0,
            compile_time_ms: 9,
        };
        assert_eq!(
            before.diff(&after).as_deref(),
            Some("units loaded 10 -> 12, compile time 5 ms -> 9 ms")
        );

        let reset = RuntimeSnapshot {
            units_unloaded: 0,
            units_loaded: 3,
            compile_time_ms: 5,
        };
        assert_eq!(
            before.diff(&reset).as_deref(),
            Some("units loaded 10 -> 3 (anomalous decrease)")
        );
    }

    #[test]
    fn test_native_snapshot_is_stable() {
        let probe = NativeRuntime::new();
        let a = probe.snapshot();
        let b = probe.snapshot();

        assert_eq!(a, b);
        assert_eq!(a.compile_time_ms, -1);
    }

    #[test]
    fn test_native_prepare_and_cleanup() {
        let probe = NativeRuntime::new();
        probe.prepare().unwrap();
        probe.force_cleanup();
        assert_eq!(probe.snapshot(), probe.snapshot());
    }

    #[test]
    fn test_display_unsupported() {
        assert_eq!(
            RuntimeSnapshot::UNSUPPORTED.to_string(),
            "loaded = 0, unloaded = 0, compile time = unsupported"
        );
    }
}
