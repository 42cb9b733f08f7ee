//! JSON line output for structured records.
//!
//! Loggers pass their [`LogAttributeSet`] as one `attributes` field. This
//! layer merges those keys into the top level of each line, so `source`,
//! `method`, `code` and the `headers` map are fields of the record itself.

use std::fmt;
use std::io::Write;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::logging::attributes::LogAttributeSet;

/// Field name loggers use for their attribute set.
pub const ATTRIBUTES_FIELD: &str = "attributes";

/// Keys owned by the line itself; attributes never replace them.
const ENVELOPE_KEYS: [&str; 4] = ["timestamp", "level", "target", "message"];

/// A layer writing one JSON object per event.
pub struct JsonLayer<W> {
    make_writer: W,
}

impl<W> JsonLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    pub fn new(make_writer: W) -> Self {
        Self { make_writer }
    }
}

#[derive(Default)]
struct JsonVisitor {
    message: String,
    attributes: LogAttributeSet,
    fields: LogAttributeSet,
}

impl JsonVisitor {
    fn record_text(&mut self, field: &Field, text: String) {
        match field.name() {
            "message" => self.message = text,
            ATTRIBUTES_FIELD => match serde_json::from_str::<LogAttributeSet>(&text) {
                Ok(set) => self.attributes = set,
                Err(_) => self.fields.insert(ATTRIBUTES_FIELD, text),
            },
            name => self.fields.insert(name, text),
        }
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name(), value);
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let mut timestamp = String::new();
        if SystemTime.format_time(&mut Writer::new(&mut timestamp)).is_err() {
            timestamp.clear();
        }

        let mut record = LogAttributeSet::new()
            .with("timestamp", timestamp)
            .with("level", metadata.level().to_string())
            .with("target", metadata.target())
            .with("message", visitor.message);
        for (key, value) in visitor.attributes.iter().chain(visitor.fields.iter()) {
            if !ENVELOPE_KEYS.contains(&key) {
                record.insert(key, value.clone());
            }
        }

        let mut line = record.to_string();
        line.push('\n');
        let mut writer = self.make_writer.make_writer_for(metadata);
        // nowhere left to report a failed log write
        let _ = writer.write_all(line.as_bytes());
    }
}

/// Parse the lines written by a [`JsonLayer`].
pub fn parse_lines(output: &str) -> Vec<Value> {
    output
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::logging::capture::CaptureWriter;
    use crate::logging::composer::ContextLogger;

    #[test]
    fn test_attributes_become_top_level_fields() {
        let buffer = CaptureWriter::default();
        let subscriber = tracing_subscriber::registry().with(JsonLayer::new(buffer.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let logger = ContextLogger::new(
            LogAttributeSet::new()
                .with("source", "CtxLog")
                .with("method", "GET widgets - LIST")
                .with("headers", json!({"operation_id": "op-1"})),
        );
        logger.with("attempt", 2).warn("retrying");

        let lines = parse_lines(&buffer.contents());
        assert_eq!(lines.len(), 1);
        let record = &lines[0];
        assert_eq!(record["level"], "WARN");
        assert_eq!(record["message"], "retrying");
        assert_eq!(record["source"], "CtxLog");
        assert_eq!(record["attempt"], 2);
        assert_eq!(record["headers"]["operation_id"], "op-1");
        assert!(record.get("attributes").is_none());
    }

    #[test]
    fn test_envelope_keys_are_not_replaced() {
        let buffer = CaptureWriter::default();
        let subscriber = tracing_subscriber::registry().with(JsonLayer::new(buffer.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let attributes = LogAttributeSet::new().with("message", "shadow").with("code", 200);
        tracing::info!(attributes = %attributes, count = 3u64, "real message");

        let record = &parse_lines(&buffer.contents())[0];
        assert_eq!(record["message"], "real message");
        assert_eq!(record["code"], 200);
        assert_eq!(record["count"], 3);
    }

    #[test]
    fn test_plain_events_keep_their_fields() {
        let buffer = CaptureWriter::default();
        let subscriber = tracing_subscriber::registry().with(JsonLayer::new(buffer.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::error!(error = "boom", "Audit send failed");

        let record = &parse_lines(&buffer.contents())[0];
        assert_eq!(record["level"], "ERROR");
        assert_eq!(record["error"], "boom");
        assert!(record["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    }
}
