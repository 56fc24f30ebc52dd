//! Task Measurement
//!
//! Times `n` back-to-back calls of a task as one block. Every output goes
//! through [`black_box`] so the optimizer cannot drop the work, and the last
//! output is kept so it can be shown once the run is over.

use crate::clock::ClockSource;
use crate::error::{BenchError, TaskError};
use crate::runtime::{RuntimeProbe, RuntimeSnapshot};
use std::hint::black_box;

/// One timed block of task executions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Total block duration in seconds
    pub duration_seconds: f64,
    /// Runtime counters captured right after the block
    pub snapshot: RuntimeSnapshot,
}

/// Runs and times a task in blocks
pub struct TaskMeasurer<'r, T, F> {
    task: F,
    clock: ClockSource,
    runtime: &'r dyn RuntimeProbe,
    last_output: Option<T>,
}

impl<'r, T, E, F> TaskMeasurer<'r, T, F>
where
    F: FnMut() -> Result<T, E>,
    E: Into<TaskError>,
{
    /// Measurer timing `task` with `clock`; snapshots come from `runtime`
    pub fn new(task: F, clock: ClockSource, runtime: &'r dyn RuntimeProbe) -> Self {
        Self {
            task,
            clock,
            runtime,
            last_output: None,
        }
    }

    /// Execute the task `n` times and time the whole block.
    ///
    /// The first task error aborts the block and is returned as
    /// [`BenchError::Task`].
    #[inline(never)]
    pub fn measure(&mut self, n: i64) -> Result<Measurement, BenchError> {
        if n <= 0 {
            return Err(BenchError::InvalidRepetitions(n));
        }

        let mut last = None;
        let start = self.clock.now();
        for _ in 0..n {
            match (self.task)() {
                Ok(output) => last = Some(black_box(output)),
                Err(e) => return Err(BenchError::Task(e.into())),
            }
        }
        let end = self.clock.now();

        let duration_seconds = ClockSource::elapsed_seconds(start, end)?;
        let snapshot = self.runtime.snapshot();
        if last.is_some() {
            self.last_output = last;
        }

        Ok(Measurement {
            duration_seconds,
            snapshot,
        })
    }

    /// Output of the most recent task call, if any block has completed
    pub fn last_output(&self) -> Option<&T> {
        self.last_output.as_ref()
    }
}
