//! Document, filter and index types.

use serde_json::Value;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Equality filter over top-level document fields.
///
/// An empty filter matches every document. A `null` clause matches a field
/// that is either `null` or missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Check whether a document satisfies every clause.
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|(field, expected)| {
            let actual = doc.get(field).unwrap_or(&Value::Null);
            actual == expected
        })
    }

    /// Check if this filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// A unique index over one or more top-level fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    /// Index name, reported on violations.
    pub name: String,
    /// Fields making up the key, in order.
    pub fields: Vec<String>,
    /// Sparse indexes ignore documents where every key field is null or missing.
    pub sparse: bool,
}

impl UniqueIndex {
    /// Create a (non-sparse) unique index.
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            sparse: false,
        }
    }

    /// Make the index sparse.
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Extract the index key from a document.
    ///
    /// Returns `None` when a sparse index does not cover the document.
    pub fn key_of(&self, doc: &Document) -> Option<Vec<Value>> {
        let key: Vec<Value> = self
            .fields
            .iter()
            .map(|f| doc.get(f).cloned().unwrap_or(Value::Null))
            .collect();

        if self.sparse && key.iter().all(Value::is_null) {
            return None;
        }
        Some(key)
    }
}
