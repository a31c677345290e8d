use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Sink for operational events raised while handling visits.
///
/// Handlers receive it through their state so tests can swap in
/// [`MemoryLog`] and assert on what was reported.
pub trait EventLog: Send + Sync {
    fn log(&self, severity: Severity, message: &str);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl EventLog for TracingLog {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "footfall::events", "{message}"),
            Severity::Warning => tracing::warn!(target: "footfall::events", "{message}"),
            Severity::Error => tracing::error!(target: "footfall::events", "{message}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// True if any entry at `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(s, m)| *s == severity && m.contains(needle))
    }
}

impl EventLog for MemoryLog {
    fn log(&self, severity: Severity, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((severity, message.to_string()));
        }
    }
}
