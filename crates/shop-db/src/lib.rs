//! Document store layer for the shopfront cart service.
//!
//! Records are stored as JSON documents grouped into named collections.
//! Lookups use top-level field equality filters, and collections may carry
//! unique indexes that reject a second document with the same key.
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_db::{filter, Db, MemoryStore, UniqueIndex};
//! use std::sync::Arc;
//!
//! let db = Db::new(Arc::new(MemoryStore::new()));
//! db.create_index("carts", UniqueIndex::new("identity", ["user_id", "cookie_id"]).sparse())
//!     .await?;
//!
//! db.insert("carts", &cart).await?;
//! let found: Option<Cart> = db.find_one_as("carts", &filter!["cookie_id" => "sess_abc"]).await?;
//! ```

mod db;
mod error;
mod types;

pub use db::{Db, DocumentStore, MemoryStore};
pub use error::DbError;
pub use types::{Document, Filter, UniqueIndex};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{filter, Db, DbError, Document, DocumentStore, Filter, MemoryStore, UniqueIndex};
}

/// Build an equality [`Filter`] from `field => value` pairs.
///
/// # Example
///
/// ```rust,ignore
/// use shop_db::filter;
///
/// let by_cookie = filter!["cookie_id" => "sess_abc"];
/// let by_both = filter!["user_id" => "u1", "cookie_id" => "sess_abc"];
/// ```
#[macro_export]
macro_rules! filter {
    () => {
        $crate::Filter::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Filter::new()$(.eq($field, $value))+
    };
}
