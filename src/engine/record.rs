//! Record shapes flowing through the expansion pipeline.

use indexmap::IndexMap;
use serde_json::Value;

use crate::input::Scalar;

/// A field value before filtering: either a concrete scalar or a dynamic
/// expression awaiting lazy evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Scalar(Scalar),
    Dynamic(String),
}

/// An intermediate record: named fields in insertion order plus the
/// accumulated, not-yet-evaluated conditions.
///
/// Merging resolves field collisions last-writer-wins; conditions always
/// accumulate and are never overwritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub fields: IndexMap<String, OutputValue>,
    pub conditions: Vec<String>,
}

impl PartialRecord {
    /// A record holding a single field.
    pub fn with_field(key: impl Into<String>, value: OutputValue) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(key.into(), value);
        Self {
            fields,
            conditions: Vec::new(),
        }
    }

    /// A fieldless record carrying only pending conditions.
    pub fn with_conditions(conditions: Vec<String>) -> Self {
        Self {
            fields: IndexMap::new(),
            conditions,
        }
    }

    /// Whether the record carries at least one real field.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Merge another record into this one: fields last-writer-wins
    /// (keeping first-insertion position), conditions concatenated.
    pub fn absorb(&mut self, other: &PartialRecord) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
        self.conditions.extend(other.conditions.iter().cloned());
    }
}

/// A finalized record: every condition consumed, every dynamic field
/// frozen to its first-read value.
pub type FinalRecord = IndexMap<String, Value>;

/// Stringified form used by the dedup pass: strings compare bare, other
/// values by their JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
