//! Field loggability metadata.
//!
//! The schema system that owns message definitions is external; it is
//! consulted through [`SchemaSource`]. [`StaticSchema`] is a serde-loadable
//! implementation for configuration files and tests:
//!
//! ```toml
//! [messages."demo.CreateWidget".fields.password]
//! loggable = false
//!
//! [messages."demo.CreateWidget".fields.spec]
//! kind = "message"
//! message_type = "demo.WidgetSpec"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Scalar,
    /// A nested message, single or repeated.
    Message,
    /// A map/dictionary field. Never recursed into.
    Map,
}

/// Policy for one field, keyed by its JSON name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldDescriptor {
    /// `Some(false)` drops the field; `Some(true)` and `None` keep it.
    pub loggable: Option<bool>,
    pub kind: FieldKind,
    /// Type name of the nested message when `kind` is `message`.
    pub message_type: Option<String>,
}

impl FieldDescriptor {
    pub fn is_loggable(&self) -> bool {
        self.loggable != Some(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MessageDescriptor {
    pub fields: BTreeMap<String, FieldDescriptor>,
}

impl MessageDescriptor {
    pub fn field(&self, json_name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(json_name)
    }

    pub fn with_field(mut self, json_name: impl Into<String>, field: FieldDescriptor) -> Self {
        self.fields.insert(json_name.into(), field);
        self
    }
}

/// Read-only access to message descriptors by type name.
pub trait SchemaSource: Send + Sync {
    fn message(&self, type_name: &str) -> Option<&MessageDescriptor>;
}

/// An in-memory schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticSchema {
    pub messages: BTreeMap<String, MessageDescriptor>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, type_name: impl Into<String>, message: MessageDescriptor) -> Self {
        self.messages.insert(type_name.into(), message);
        self
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl SchemaSource for StaticSchema {
    fn message(&self, type_name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(type_name)
    }
}

/// A message type that names its schema entry.
pub trait Loggable {
    const MESSAGE_TYPE: &'static str;
}

/// Shorthand constructors used when building schemas in code.
impl FieldDescriptor {
    pub fn secret() -> Self {
        Self {
            loggable: Some(false),
            ..Self::default()
        }
    }

    pub fn message(message_type: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Message,
            message_type: Some(message_type.into()),
            ..Self::default()
        }
    }

    pub fn map() -> Self {
        Self {
            kind: FieldKind::Map,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_from_toml() {
        let schema = StaticSchema::from_toml(
            r#"
            [messages."demo.CreateWidget".fields.password]
            loggable = false

            [messages."demo.CreateWidget".fields.spec]
            kind = "message"
            message_type = "demo.WidgetSpec"

            [messages."demo.CreateWidget".fields.labels]
            kind = "map"
            "#,
        )
        .unwrap();

        let message = schema.message("demo.CreateWidget").unwrap();
        assert!(!message.field("password").unwrap().is_loggable());
        assert_eq!(message.field("spec").unwrap().kind, FieldKind::Message);
        assert_eq!(message.field("labels").unwrap().kind, FieldKind::Map);
        assert!(message.field("labels").unwrap().is_loggable());
        assert!(schema.message("demo.Unknown").is_none());
    }
}
