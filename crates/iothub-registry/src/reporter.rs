//! Human-readable progress output.

use std::fmt;
use std::io::{self, Write};

use crate::twin::Twin;

/// Receives progress of sample operations.
pub trait SampleReporter: Send + Sync {
    /// A section heading, e.g. before listing twins.
    fn heading(&self, title: &str);

    /// An operation has started.
    fn step_started(&self, message: &str);

    /// The last started operation has finished with `outcome`.
    fn step_finished(&self, outcome: &str);

    /// One twin from an enumeration.
    fn twin(&self, twin: &Twin);
}

/// Formats a twin as a single aligned console line.
#[must_use]
pub fn format_twin_line(twin: &Twin) -> String {
    let last_seen = twin
        .last_activity_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();
    format!(
        "\t{:<50} : {:>12} : Last seen: {last_seen:<10}",
        twin.device_id,
        twin.connection_state.to_string()
    )
}

/// Reporter that writes to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Creates a console reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SampleReporter for ConsoleReporter {
    fn heading(&self, title: &str) {
        emit(&mut io::stdout().lock(), format_args!("{title}\n"));
    }

    fn step_started(&self, message: &str) {
        emit(&mut io::stdout().lock(), format_args!("{message} . . . "));
    }

    fn step_finished(&self, outcome: &str) {
        emit(&mut io::stdout().lock(), format_args!("{outcome}\n"));
    }

    fn twin(&self, twin: &Twin) {
        emit(&mut io::stdout().lock(), format_args!("{}\n", format_twin_line(twin)));
    }
}

/// Writes and flushes progress output.
///
/// Write errors are logged at debug level and dropped; a closed stdout never
/// interrupts a workflow.
fn emit(out: &mut dyn Write, text: fmt::Arguments<'_>) {
    if let Err(err) = out.write_fmt(text).and_then(|()| out.flush()) {
        tracing::debug!(error = %err, "Dropped console progress output");
    }
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl SampleReporter for SilentReporter {
    fn heading(&self, _title: &str) {}

    fn step_started(&self, _message: &str) {}

    fn step_finished(&self, _outcome: &str) {}

    fn twin(&self, _twin: &Twin) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ConnectionState;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_twin_line() {
        let mut twin = Twin::new("sensor-1", "etag");
        twin.connection_state = ConnectionState::Connected;
        twin.last_activity_time = Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let line = format_twin_line(&twin);
        assert!(line.starts_with("\tsensor-1 "));
        assert!(line.contains(" :    Connected : "));
        assert!(line.ends_with("Last seen: 2024-05-01T10:00:00+00:00"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_emit_writes_and_flushes() {
        let mut out = Vec::new();
        emit(&mut out, format_args!("{} . . . ", "Remove device 'd1'"));
        emit(&mut out, format_args!("{}\n", "DONE"));
        assert_eq!(String::from_utf8(out).unwrap(), "Remove device 'd1' . . . DONE\n");
    }

    #[test]
    fn test_emit_drops_write_errors() {
        emit(&mut ClosedPipe, format_args!("Querying devices:\n"));
        emit(&mut ClosedPipe, format_args!("{} . . . ", "Adding device 'd1'"));
    }

    #[test]
    fn test_format_twin_line_never_seen() {
        let line = format_twin_line(&Twin::new("sensor-2", "etag"));
        assert!(line.contains("Disconnected"));
        assert!(line.trim_end().ends_with("Last seen:"));
    }
}
