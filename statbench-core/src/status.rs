//! Progress Status
//!
//! A run reports what it is doing through a [`StatusSink`]. The console sink
//! draws a single spinner line on stderr that is erased when the run ends,
//! so finished output is never interleaved with progress text.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Receiver of transient progress text
pub trait StatusSink: Send + Sync {
    /// Replace the current status line
    fn write_status(&self, text: &str);

    /// Erase the status line
    fn clear_status(&self);
}

/// Discards all status text
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn write_status(&self, _text: &str) {}

    fn clear_status(&self) {}
}

/// Spinner on stderr
#[derive(Default)]
pub struct ConsoleStatus {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleStatus {
    /// Status line that shows nothing until the first update
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

impl StatusSink for ConsoleStatus {
    fn write_status(&self, text: &str) {
        let mut bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        bar.get_or_insert_with(Self::spinner)
            .set_message(text.to_string());
    }

    fn clear_status(&self) {
        let mut bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Clears the sink when dropped, on success, error and panic alike
pub(crate) struct StatusGuard<'a> {
    sink: &'a dyn StatusSink,
}

impl<'a> StatusGuard<'a> {
    pub(crate) fn new(sink: &'a dyn StatusSink) -> Self {
        Self { sink }
    }

    pub(crate) fn set(&self, text: &str) {
        self.sink.write_status(text);
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        self.sink.clear_status();
    }
}
