//! Ordered log attribute set.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Ordered key → value attributes.
///
/// Writers may add or override keys but never delete them; an overridden key
/// keeps the position where it was first inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogAttributeSet {
    entries: Vec<(String, Value)>,
}

impl LogAttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for LogAttributeSet {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for LogAttributeSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Serialize for LogAttributeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Reads a JSON object back in document order.
impl<'de> Deserialize<'de> for LogAttributeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = LogAttributeSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of log attributes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut set = LogAttributeSet::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    set.insert(key, value);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

/// Renders as a JSON object in insertion order.
impl fmt::Display for LogAttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_override_keeps_position() {
        let set = LogAttributeSet::new()
            .with("source", "CtxLog")
            .with("method", "GET")
            .with("source", "ApiRequestLog");
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["source", "method"]);
        assert_eq!(set.get("source"), Some(&json!("ApiRequestLog")));
    }

    #[test]
    fn test_display_is_ordered_json() {
        let set: LogAttributeSet = [("z", json!(1)), ("a", json!("x"))].into_iter().collect();
        assert_eq!(set.to_string(), r#"{"z":1,"a":"x"}"#);
    }

    #[test]
    fn test_parse_keeps_document_order() {
        let set: LogAttributeSet =
            serde_json::from_str(r#"{"source":"CtxLog","method":"GET","code":200}"#).unwrap();
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["source", "method", "code"]);
        assert_eq!(set.get("code"), Some(&json!(200)));
    }
}
