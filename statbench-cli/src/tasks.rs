//! Built-in Tasks
//!
//! A small catalogue of tasks for trying the harness out and for checking a
//! machine's timing behaviour.

use statbench_core::{BenchError, Benchmark, BenchmarkResult, noise_probe};
use std::hint::black_box;
use std::time::Duration;

/// A task the CLI can run by name
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTask {
    /// Name used on the command line
    pub name: &'static str,
    /// One-line description for `statbench list`
    pub description: &'static str,
    /// Actions one call performs, unless overridden
    pub actions_per_call: u64,
    runner: fn(&Benchmark) -> Result<BenchmarkResult, BenchError>,
}

impl BuiltinTask {
    /// Benchmark this task with `bench`
    pub fn run(&self, bench: &Benchmark) -> Result<BenchmarkResult, BenchError> {
        (self.runner)(bench)
    }
}

fn sum_1k() -> u64 {
    (0..1000u64).map(black_box).sum()
}

fn alloc_vec() -> usize {
    let v = black_box(vec![0u8; 4096]);
    v.len()
}

/// All built-in tasks, in listing order
pub const TASKS: &[BuiltinTask] = &[
    BuiltinTask {
        name: "noop",
        description: "empty task, measures harness overhead",
        actions_per_call: 1,
        runner: |b| b.run(|| ()),
    },
    BuiltinTask {
        name: "sleep-1ms",
        description: "sleeps for one millisecond",
        actions_per_call: 1,
        runner: |b| b.run(|| std::thread::sleep(Duration::from_millis(1))),
    },
    BuiltinTask {
        name: "sum-1k",
        description: "sums 1000 integers, one action per addition",
        actions_per_call: 1000,
        runner: |b| b.run(sum_1k),
    },
    BuiltinTask {
        name: "alloc-vec",
        description: "allocates and frees a zeroed 4 KiB vector",
        actions_per_call: 1,
        runner: |b| b.run(alloc_vec),
    },
    BuiltinTask {
        name: "noise-floor",
        description: "the probe task used to estimate environmental noise",
        actions_per_call: 1,
        runner: |b| b.run(noise_probe),
    },
];

/// Look up a task by name
pub fn find_task(name: &str) -> Option<&'static BuiltinTask> {
    TASKS.iter().find(|t| t.name == name)
}
