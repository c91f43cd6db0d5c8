//! Custom tracing layer for JSONL output.
//!
//! Each event becomes one JSON object on its own line. Correlation fields
//! (`run_id`, `job_id`, `entity_id`, `stage`) are lifted from enclosing spans
//! to the top level; everything else lands under `fields`.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::Level;

const CORRELATION_FIELDS: [&str; 4] = ["run_id", "job_id", "stage", "entity_id"];

/// Correlation fields recorded on one span, stored in span extensions.
#[derive(Debug, Default)]
struct Correlation(Map<String, Value>);

impl Visit for Correlation {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if CORRELATION_FIELDS.contains(&field.name()) {
            self.0.insert(field.name().to_string(), value.into());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if !CORRELATION_FIELDS.contains(&field.name()) {
            return;
        }
        // Entity ids stay numeric even when recorded with `%`
        let value = match (field.name(), value.parse::<u64>()) {
            ("entity_id", Ok(id)) => Value::from(id),
            _ => Value::from(value),
        };
        self.0.insert(field.name().to_string(), value);
    }

    // `%value` fields arrive here as Display wrappers
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Event message plus the remaining fields.
#[derive(Default)]
struct EventFields {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl EventFields {
    fn put(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.put(field, value.into());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON form
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.put(field, Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }
}

/// Writes one JSON object per tracing event.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut correlation = Correlation::default();
        attrs.record(&mut correlation);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(correlation);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut line = Map::new();
        line.insert("ts".into(), Utc::now().to_rfc3339().into());
        line.insert(
            "level".into(),
            serde_json::to_value(Level::from(*event.metadata().level())).unwrap_or_default(),
        );
        line.insert("event".into(), event.metadata().target().into());

        // Scope runs innermost first, so the first value seen wins
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(correlation) = span.extensions().get::<Correlation>() {
                    for (key, value) in &correlation.0 {
                        line.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        let mut recorded = EventFields::default();
        event.record(&mut recorded);
        if let Some(message) = recorded.message {
            line.insert("message".into(), message.into());
        }
        if !recorded.fields.is_empty() {
            line.insert("fields".into(), Value::Object(recorded.fields));
        }

        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}
