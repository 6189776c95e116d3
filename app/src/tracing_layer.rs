// In app/src/tracing_layer.rs

use events::{EngineEvent, EventKind, LogLine};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;

pub const LOG_CACHE_SIZE: usize = 200;

pub type LogCache = Arc<Mutex<VecDeque<LogLine>>>;

/// Forwards every log line into the engine's event channel as a `Log` event
/// and keeps the most recent lines for replay.
pub struct EventLogLayer {
    tx: broadcast::Sender<EngineEvent>,
    cache: LogCache,
}

impl EventLogLayer {
    pub fn new(tx: broadcast::Sender<EngineEvent>, cache: LogCache) -> Self {
        Self { tx, cache }
    }
}

impl<S> Layer<S> for EventLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = LogMessageVisitor::default();
        event.record(&mut visitor);
        let line = LogLine {
            level: event.metadata().level().to_string(),
            message: visitor.finish(),
        };
        let _ = self.tx.send(EngineEvent::now(EventKind::Log(line.clone())));

        // A poisoned cache only loses replay history.
        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() >= LOG_CACHE_SIZE {
                cache.pop_front();
            }
            cache.push_back(line);
        }
    }
}

/// Captures the `message` field plus the structured fields as `key=value`.
#[derive(Default)]
struct LogMessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl LogMessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl tracing::field::Visit for LogMessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}
