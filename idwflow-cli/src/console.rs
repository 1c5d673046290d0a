//! Terminal rendering of pipeline events.

use idwflow::events::{EventSink, LoggingEventSink, PipelineEvent, ShellStatus};
use std::io::Write;

/// Prints the coarse run status, or every event as a JSON line.
///
/// Events are also forwarded to `tracing` at debug level.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    json: bool,
    log: LoggingEventSink,
}

impl ConsoleSink {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            log: LoggingEventSink::debug(),
        }
    }

    fn render(&self, event: &PipelineEvent) -> Option<String> {
        if self.json {
            return Some(event.to_json().to_string());
        }
        event.shell_status().map(|status| match status {
            ShellStatus::Started => "Processing...".to_string(),
            ShellStatus::Succeeded(path) => format!("Process completed: {}", path.display()),
            ShellStatus::Failed(message) => format!("Error: {message}"),
        })
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &PipelineEvent) {
        self.log.emit(event);
        if let Some(line) = self.render(event) {
            let mut out = std::io::stdout().lock();
            // A closed stdout must not fail the run.
            let _ = writeln!(out, "{line}");
        }
    }
}
