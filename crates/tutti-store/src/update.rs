//! Partial-update vocabulary for record patches.
//!
//! An `UpdateSpec` carries `$push`, `$pull`, `$inc`, and `$set` maps keyed by
//! dotted field paths, and serializes to the familiar document-store shape:
//!
//! ```json
//! {
//!   "$push": {"enrollment.enrolledStudents": {"studentId": "stu-01"}},
//!   "$inc":  {"capacity.currentEnrollment": 1}
//! }
//! ```
//!
//! A `$[name]` path segment addresses every element of an array that matches
//! the `ArrayFilter` with the same name in `PatchOptions::array_filters`.
//! `Precondition`s are checked against the stored document before anything
//! is applied; the whole patch is rejected if one does not hold.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSpec {
    #[serde(rename = "$push", default, skip_serializing_if = "Map::is_empty")]
    pub push: Map<String, Value>,
    #[serde(rename = "$pull", default, skip_serializing_if = "Map::is_empty")]
    pub pull: Map<String, Value>,
    #[serde(rename = "$inc", default, skip_serializing_if = "Map::is_empty")]
    pub inc: Map<String, Value>,
    #[serde(rename = "$set", default, skip_serializing_if = "Map::is_empty")]
    pub set: Map<String, Value>,
}

impl UpdateSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.push.is_empty() && self.pull.is_empty() && self.inc.is_empty() && self.set.is_empty()
    }
}

pub struct UpdateBuilder(UpdateSpec);

impl UpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(UpdateSpec::default())
    }

    /// Append `value` to the array at `field`.
    #[must_use]
    pub fn push(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.push.insert(field.into(), value);
        self
    }

    /// Remove array elements at `field` matching `condition`.
    ///
    /// An object condition matches elements whose listed fields all equal
    /// the given values; any other value matches equal elements.
    #[must_use]
    pub fn pull(mut self, field: impl Into<String>, condition: Value) -> Self {
        self.0.pull.insert(field.into(), condition);
        self
    }

    /// Add `by` to the number at `field`.
    #[must_use]
    pub fn inc(mut self, field: impl Into<String>, by: i64) -> Self {
        self.0.inc.insert(field.into(), Value::from(by));
        self
    }

    /// Overwrite `field` with `value`.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.set.insert(field.into(), value);
        self
    }

    #[must_use]
    pub fn build(self) -> UpdateSpec {
        self.0
    }
}

impl Default for UpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects array elements for a `$[name]` path segment.
///
/// Conditions are `(field, value)` pairs relative to the element; all must
/// hold for the element to match.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFilter {
    pub name: String,
    pub conditions: Vec<(String, Value)>,
}

impl ArrayFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
        }
    }

    #[must_use]
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Document-store form: `{"elem.lessonId": "thr-01", "elem.status": "active"}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map = self
            .conditions
            .iter()
            .map(|(field, value)| (format!("{}.{field}", self.name), value.clone()))
            .collect::<Map<String, Value>>();
        Value::Object(map)
    }
}

/// A condition the stored document must satisfy for a patch to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// `doc[field] < doc[limit_field]`. A missing or null limit is unbounded.
    Below { field: String, limit_field: String },
    /// The array at `field` holds an element with `element[key] == value`.
    ArrayContains {
        field: String,
        key: String,
        value: String,
    },
    /// The array at `field` holds an element matching `condition`, with the
    /// same matching rules as `$pull`.
    ArrayMatches { field: String, condition: Value },
    /// No element of the array at `field` matches `condition`. A missing
    /// array holds nothing.
    ArrayLacks { field: String, condition: Value },
}

/// Opaque transaction token forwarded to the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHandle(pub String);

impl std::fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options accompanying a patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchOptions {
    pub transaction: Option<TransactionHandle>,
    pub array_filters: Vec<ArrayFilter>,
    pub preconditions: Vec<Precondition>,
}

impl PatchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn transaction(mut self, transaction: Option<TransactionHandle>) -> Self {
        self.transaction = transaction;
        self
    }

    #[must_use]
    pub fn array_filter(mut self, filter: ArrayFilter) -> Self {
        self.array_filters.push(filter);
        self
    }

    #[must_use]
    pub fn precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Array filters in document-store form, for logging.
    #[must_use]
    pub fn array_filters_json(&self) -> Value {
        Value::Array(self.array_filters.iter().map(ArrayFilter::to_json).collect())
    }
}
