//! Database error types.

use thiserror::Error;

/// Errors that can occur when using the document store.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to execute an operation against the store.
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// Failed to convert between a record and its document form.
    #[error("Deserialization error: {0}")]
    DeserializeError(String),

    /// A write would have produced two documents with the same unique key.
    #[error("Unique index '{index}' violated in collection '{collection}'")]
    UniqueViolation { collection: String, index: String },

    /// The store is not reachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::DeserializeError(e.to_string())
    }
}
