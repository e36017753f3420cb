use std::sync::{Arc, Mutex, PoisonError};

use crate::logging::sink::{LogRecord, LogSink, Severity};

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn from_component(&self, component: &str) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.component == component)
            .collect()
    }

    /// Number of records with this exact severity and message.
    pub fn count_matching(&self, severity: Severity, message: &str) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.severity == severity && record.message.contains(message))
            .count()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn record(&self, severity: Severity, component: &str, message: &str) {
        let record = LogRecord::now(severity, component, message);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Forwards every record to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl LogSink for FanoutSink {
    fn record(&self, severity: Severity, component: &str, message: &str) {
        for sink in &self.sinks {
            sink.record(severity, component, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order_and_thread_name() {
        let sink = MemorySink::new();
        sink.record(Severity::Info, "a", "first");
        sink.record(Severity::Warn, "b", "second");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "first");
        assert_eq!(records[1].severity, Severity::Warn);
        assert_eq!(sink.from_component("b").len(), 1);
    }

    #[test]
    fn fanout_delivers_to_every_sink() {
        let left = Arc::new(MemorySink::new());
        let right = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new().with(left.clone()).with(right.clone());

        fanout.record(Severity::Info, "thread_creation", "Thread is Running");

        assert_eq!(left.count_matching(Severity::Info, "Thread is Running"), 1);
        assert_eq!(right.count_matching(Severity::Info, "Thread is Running"), 1);
    }
}
