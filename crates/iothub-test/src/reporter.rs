//! Reporter that captures progress output.

use parking_lot::Mutex;

use iothub_registry::{format_twin_line, SampleReporter, Twin};

/// Collects reported lines in memory.
///
/// A started step and its outcome are joined into one line, the way they
/// appear on a console.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
    pending: Mutex<Option<String>>,
}

impl RecordingReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all completed lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Returns true if any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}

impl SampleReporter for RecordingReporter {
    fn heading(&self, title: &str) {
        self.lines.lock().push(title.to_string());
    }

    fn step_started(&self, message: &str) {
        *self.pending.lock() = Some(message.to_string());
    }

    fn step_finished(&self, outcome: &str) {
        let message = self.pending.lock().take().unwrap_or_default();
        self.lines.lock().push(format!("{message} . . . {outcome}"));
    }

    fn twin(&self, twin: &Twin) {
        self.lines.lock().push(format_twin_line(twin));
    }
}
