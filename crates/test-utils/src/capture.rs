use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// One event seen by [`CapturedEvents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Names of the structured fields besides `message`.
    pub fields: Vec<String>,
}

/// A `Layer` that keeps every event it sees, for asserting on log output.
///
/// Install it for the current thread only:
///
/// ```ignore
/// let captured = CapturedEvents::default();
/// let _guard = tracing::subscriber::set_default(
///     tracing_subscriber::registry().with(captured.clone()),
/// );
/// ```
#[derive(Clone, Default)]
pub struct CapturedEvents {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedEvents {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Messages of plain (field-less) events at `level` from `target`.
    pub fn messages(&self, level: Level, target: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level && e.target == target && e.fields.is_empty())
            .map(|e| e.message)
            .collect()
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<String>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(field.name().to_string());
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        let meta = event.metadata();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *meta.level(),
            target: meta.target().to_string(),
            message: collector.message,
            fields: collector.fields,
        });
    }
}
