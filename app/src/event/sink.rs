use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use infrastructure::EventEmitter;

use super::{EventRecord, EventSink, EventType};
use crate::core::BoundedHistory;

pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, record: EventRecord) {
        match record.event_type {
            EventType::Error => tracing::warn!("{}", record),
            _ => tracing::info!("{}", record),
        }
    }
}

/// Keeps the most recent records for on-demand inspection.
pub struct MemoryEventSink {
    records: Mutex<BoundedHistory<EventRecord>>,
}

impl MemoryEventSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(BoundedHistory::new(capacity)),
        }
    }

    /// Last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<EventRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).last_n(n)
    }

    pub fn all(&self) -> Vec<EventRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().cloned().collect()
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&self, record: EventRecord) {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).push(record);
    }
}

/// One JSON document per line, appended. The file stays open between records; a failed write
/// closes it so the next record reopens. Failures are logged and dropped.
pub struct JsonLinesEventSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonLinesEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    fn append(&self, record: &EventRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());

        if file.is_none() {
            *file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }

        if let Some(handle) = file.as_mut() {
            if let Err(e) = writeln!(handle, "{}", line) {
                *file = None;
                return Err(e.into());
            }
        }

        Ok(())
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.file.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl EventSink for JsonLinesEventSink {
    fn publish(&self, record: EventRecord) {
        if let Err(e) = self.append(&record) {
            tracing::error!("Error appending event to {}: {:?}", self.path.display(), e);
        }
    }
}

pub struct BroadcastEventSink {
    emitter: EventEmitter<EventRecord>,
}

impl BroadcastEventSink {
    pub fn new(emitter: EventEmitter<EventRecord>) -> Self {
        Self { emitter }
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, record: EventRecord) {
        self.emitter.send(record);
    }
}

#[derive(Default)]
pub struct FanOutEventSink {
    sinks: Vec<Box<dyn EventSink + Send + Sync>>,
}

impl FanOutEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + Send + Sync + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanOutEventSink {
    fn publish(&self, record: EventRecord) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.publish(record.clone());
            }
            last.publish(record);
        }
    }
}
