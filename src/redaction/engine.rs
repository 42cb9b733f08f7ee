//! Recursive pruning of non-loggable fields.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::redaction::schema::{FieldKind, Loggable, MessageDescriptor, SchemaSource};

/// Remove every field whose policy is explicitly not loggable.
///
/// Unknown message types and non-object values are returned unchanged.
/// Values that are kept are never rewritten.
pub fn redact(schema: &dyn SchemaSource, message_type: &str, value: Value) -> Value {
    match value {
        Value::Object(mut map) => match schema.message(message_type) {
            Some(descriptor) => {
                prune(schema, descriptor, &mut map);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn prune(schema: &dyn SchemaSource, descriptor: &MessageDescriptor, map: &mut Map<String, Value>) {
    map.retain(|name, _| descriptor.field(name).map_or(true, |f| f.is_loggable()));

    for (name, value) in map.iter_mut() {
        let Some(field) = descriptor.field(name) else {
            continue;
        };
        if field.kind != FieldKind::Message {
            continue;
        }
        let Some(nested) = field.message_type.as_deref().and_then(|t| schema.message(t)) else {
            continue;
        };
        match value {
            Value::Object(sub) => prune(schema, nested, sub),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(sub) = item {
                        prune(schema, nested, sub);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Redacts messages against a shared schema.
#[derive(Clone)]
pub struct Redactor {
    schema: Arc<dyn SchemaSource>,
}

impl Redactor {
    pub fn new(schema: Arc<dyn SchemaSource>) -> Self {
        Self { schema }
    }

    pub fn redact(&self, message_type: &str, value: Value) -> Value {
        redact(self.schema.as_ref(), message_type, value)
    }

    /// Serialize `message` and redact it under its declared type.
    ///
    /// A message that fails to serialize is logged and yields `Null`.
    pub fn redact_message<M>(&self, message: &M) -> Value
    where
        M: Loggable + Serialize,
    {
        match serde_json::to_value(message) {
            Ok(value) => self.redact(M::MESSAGE_TYPE, value),
            Err(e) => {
                tracing::warn!(
                    message_type = M::MESSAGE_TYPE,
                    error = %e,
                    "Failed to serialize message for logging"
                );
                Value::Null
            }
        }
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor").finish_non_exhaustive()
    }
}
