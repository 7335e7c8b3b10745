//! In-memory capture of resolution diagnostics.
//!
//! [`TraceCollector`] is a `tracing` layer that records the events emitted
//! by the resolver (fast-path hits, subtree searches, skipped directories)
//! into a bounded buffer. The CLI attaches it for `--explain` and prints
//! the captured trail after the command finishes.

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One captured diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Event level.
    pub level: Level,
    /// Module path that emitted the event.
    pub target: String,
    /// The event message.
    pub message: String,
    /// Structured fields other than the message, as `(name, value)`.
    pub fields: Vec<(String, String)>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5} {}", self.level, self.message)?;
        for (name, value) in &self.fields {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct TraceBuffer {
    entries: Vec<TraceEntry>,
    capacity: usize,
    dropped: usize,
}

impl TraceBuffer {
    fn push(&mut self, entry: TraceEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
            self.dropped += 1;
        }
        self.entries.push(entry);
    }
}

/// A `tracing` layer that keeps events whose target starts with a prefix.
#[derive(Debug, Clone)]
pub struct TraceCollector {
    buffer: Arc<Mutex<TraceBuffer>>,
    target_prefix: String,
}

impl TraceCollector {
    /// Capture up to `capacity` events from targets starting with
    /// `target_prefix`; older events are discarded first.
    pub fn new(target_prefix: impl Into<String>, capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(TraceBuffer {
                entries: Vec::with_capacity(capacity.min(1024)),
                capacity: capacity.max(1),
                dropped: 0,
            })),
            target_prefix: target_prefix.into(),
        }
    }

    /// Capture resolver diagnostics from this crate.
    pub fn for_resolver(capacity: usize) -> Self {
        Self::new(module_path!().split("::").next().unwrap_or_default(), capacity)
    }

    /// Get a reader handle for the captured entries.
    pub fn reader(&self) -> TraceReader {
        TraceReader {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<S: Subscriber> Layer<S> for TraceCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(&self.target_prefix) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(TraceEntry {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

/// A read handle for captured entries.
#[derive(Debug, Clone)]
pub struct TraceReader {
    buffer: Arc<Mutex<TraceBuffer>>,
}

impl TraceReader {
    /// Snapshot of the captured entries, oldest first.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.entries.clone())
            .unwrap_or_default()
    }

    /// Number of entries evicted because the buffer was full.
    pub fn dropped(&self) -> usize {
        self.buffer.lock().map(|buf| buf.dropped).unwrap_or(0)
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.entries.len()).unwrap_or(0)
    }

    /// Whether nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}
