use super::traits::{LogSink, Severity};
use crate::runner::events::{EventEmitter, RunEvent};
use std::sync::{Arc, Mutex};

/// A message captured by [`MemoryLogSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    pub facility: String,
    pub message: String,
    pub severity: Severity,
    pub detail: Option<String>,
}

/// Keeps every message in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    messages: Arc<Mutex<Vec<LoggedMessage>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<LoggedMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Messages logged with the given severity
    pub fn with_severity(&self, severity: Severity) -> Vec<LoggedMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.severity == severity)
            .collect()
    }
}

impl LogSink for MemoryLogSink {
    fn log_message(&self, facility: &str, message: &str, severity: Severity, detail: Option<&str>) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(LoggedMessage {
                facility: facility.to_string(),
                message: message.to_string(),
                severity,
                detail: detail.map(str::to_string),
            });
        }
    }
}

/// Forwards messages to the run's event stream
pub struct EventLogSink {
    emitter: EventEmitter,
}

impl EventLogSink {
    pub fn new(emitter: EventEmitter) -> Self {
        Self { emitter }
    }
}

impl LogSink for EventLogSink {
    fn log_message(&self, facility: &str, message: &str, severity: Severity, detail: Option<&str>) {
        // Rendered by the console listener
        log::debug!("[{}] {:?}: {}", facility, severity, message);
        self.emitter.emit(RunEvent::Message {
            facility: facility.to_string(),
            message: message.to_string(),
            severity,
            detail: detail.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters_by_severity() {
        let sink = MemoryLogSink::new();
        sink.log_message("fac", "one", Severity::Generic, None);
        sink.log_message("fac", "two", Severity::Warning, Some("detail"));
        assert_eq!(sink.messages().len(), 2);
        let warnings = sink.with_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].detail.as_deref(), Some("detail"));
    }

    #[test]
    fn test_event_sink_emits_message_event() {
        let (emitter, mut receiver) = EventEmitter::new();
        let sink = EventLogSink::new(emitter);
        sink.log_message("fac", "hello", Severity::Passed, None);
        match receiver.try_recv() {
            Ok(RunEvent::Message {
                message, severity, ..
            }) => {
                assert_eq!(message, "hello");
                assert_eq!(severity, Severity::Passed);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
