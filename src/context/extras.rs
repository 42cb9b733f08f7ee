//! Layered key/value bag attached to a request context.
//!
//! Each [`Extras::with`] call produces a new bag with one more frame. Lookups
//! walk from the innermost frame outwards, so inner values shadow outer ones
//! while the outer bag stays untouched and reachable.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

#[derive(Clone, Default)]
pub struct Extras {
    frame: Option<Arc<Frame>>,
}

struct Frame {
    entries: Vec<(String, Value)>,
    parent: Option<Arc<Frame>>,
}

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer a single value on top of this bag.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_all([(key.into(), value.into())])
    }

    /// Layer several values as one frame. An empty iterator returns a clone.
    pub fn with_all<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        if entries.is_empty() {
            return self.clone();
        }
        Self {
            frame: Some(Arc::new(Frame {
                entries,
                parent: self.frame.clone(),
            })),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut cursor = self.frame.as_deref();
        while let Some(frame) = cursor {
            if let Some((_, v)) = frame.entries.iter().rev().find(|(k, _)| k == key) {
                return Some(v);
            }
            cursor = frame.parent.as_deref();
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    /// Effective entries, outermost first. A shadowed key keeps the position
    /// of its first appearance and carries the innermost value.
    pub fn flatten(&self) -> Vec<(String, Value)> {
        let mut frames = Vec::new();
        let mut cursor = self.frame.as_deref();
        while let Some(frame) = cursor {
            frames.push(frame);
            cursor = frame.parent.as_deref();
        }

        let mut out: Vec<(String, Value)> = Vec::new();
        for frame in frames.into_iter().rev() {
            for (key, value) in &frame.entries {
                match out.iter_mut().find(|(k, _)| k == key) {
                    Some(slot) => slot.1 = value.clone(),
                    None => out.push((key.clone(), value.clone())),
                }
            }
        }
        out
    }
}

impl fmt::Debug for Extras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.flatten()).finish()
    }
}
