//! Document store backends and the typed `Db` handle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{DbError, Document, Filter, UniqueIndex};

/// Backend for a document database.
///
/// Every operation addresses a named collection. Collections are created
/// implicitly on first use.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the first document matching `filter`.
    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, DbError>;

    /// Insert a new document, enforcing unique indexes.
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<(), DbError>;

    /// Replace the first document matching `filter`.
    ///
    /// Returns `false` if nothing matched.
    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        doc: Document,
    ) -> Result<bool, DbError>;

    /// Declare a unique index on a collection.
    async fn create_index(&self, collection: &str, index: UniqueIndex) -> Result<(), DbError>;
}

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Document>,
    indexes: Vec<UniqueIndex>,
}

impl Collection {
    /// Check `doc` against every unique index, ignoring the document at `skip`.
    fn check_unique(&self, name: &str, doc: &Document, skip: Option<usize>) -> Result<(), DbError> {
        for index in &self.indexes {
            let Some(key) = index.key_of(doc) else {
                continue;
            };
            let clash = self
                .docs
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, other)| index.key_of(other).as_ref() == Some(&key));
            if clash {
                return Err(DbError::UniqueViolation {
                    collection: name.to_string(),
                    index: index.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// In-process document store.
///
/// Suitable for development, tests and single-node deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> DbError {
    DbError::Unavailable("store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, DbError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<(), DbError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let coll = collections.entry(collection.to_string()).or_default();
        coll.check_unique(collection, &doc, None)?;
        coll.docs.push(doc);
        Ok(())
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        doc: Document,
    ) -> Result<bool, DbError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(pos) = coll.docs.iter().position(|d| filter.matches(d)) else {
            return Ok(false);
        };
        coll.check_unique(collection, &doc, Some(pos))?;
        if let Some(slot) = coll.docs.get_mut(pos) {
            *slot = doc;
        }
        Ok(true)
    }

    async fn create_index(&self, collection: &str, index: UniqueIndex) -> Result<(), DbError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let coll = collections.entry(collection.to_string()).or_default();
        if !coll.indexes.iter().any(|i| i.name == index.name) {
            tracing::debug!(collection, index = %index.name, "creating unique index");
            coll.indexes.push(index);
        }
        Ok(())
    }
}

/// Typed handle over a [`DocumentStore`].
///
/// Converts records to and from documents with serde.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

impl Db {
    /// Wrap a store backend.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Open a fresh in-memory database.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Find one record and deserialize it.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cart: Option<Cart> = db.find_one_as("carts", &filter!["user_id" => "u1"]).await?;
    /// ```
    pub async fn find_one_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<T>, DbError> {
        match self.store.find_one(collection, filter).await? {
            Some(doc) => Ok(Some(serde_json::from_value(Value::Object(doc))?)),
            None => Ok(None),
        }
    }

    /// Serialize and insert a record.
    pub async fn insert<T: Serialize>(&self, collection: &str, record: &T) -> Result<(), DbError> {
        self.store.insert_one(collection, to_document(record)?).await
    }

    /// Serialize a record and replace the document matching `filter`.
    pub async fn replace<T: Serialize>(
        &self,
        collection: &str,
        filter: &Filter,
        record: &T,
    ) -> Result<bool, DbError> {
        self.store
            .replace_one(collection, filter, to_document(record)?)
            .await
    }

    /// Declare a unique index.
    pub async fn create_index(&self, collection: &str, index: UniqueIndex) -> Result<(), DbError> {
        self.store.create_index(collection, index).await
    }
}

fn to_document<T: Serialize>(record: &T) -> Result<Document, DbError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(DbError::DeserializeError(format!(
            "record must serialize to an object, got {other}"
        ))),
    }
}
