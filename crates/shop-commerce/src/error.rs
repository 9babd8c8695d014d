//! Commerce error types.

use thiserror::Error;

/// Errors that can occur in cart operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product not found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// No cart exists for the identity.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Cache error.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The product catalog could not be loaded.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

/// Coarse classification of a [`CommerceError`] for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input.
    InvalidInput,
    /// The product, cart or line does not exist.
    NotFound,
    /// Store, cache or arithmetic failure.
    Internal,
}

impl CommerceError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::InvalidQuantity(_)
            | CommerceError::QuantityExceedsLimit(..)
            | CommerceError::ValidationError(_) => ErrorKind::InvalidInput,
            CommerceError::ProductNotFound(_)
            | CommerceError::CartNotFound(_)
            | CommerceError::ItemNotInCart(_) => ErrorKind::NotFound,
            CommerceError::Overflow
            | CommerceError::DatabaseError(_)
            | CommerceError::CacheError(_)
            | CommerceError::SerializationError(_)
            | CommerceError::CatalogUnavailable(_) => ErrorKind::Internal,
        }
    }
}

impl From<shop_db::DbError> for CommerceError {
    fn from(e: shop_db::DbError) -> Self {
        CommerceError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::Error> for CommerceError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CommerceError::DatabaseError(format!("duplicate cart identity: {db}"))
            }
            _ => CommerceError::DatabaseError(e.to_string()),
        }
    }
}

impl From<shop_cache::CacheError> for CommerceError {
    fn from(e: shop_cache::CacheError) -> Self {
        CommerceError::CacheError(e.to_string())
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CommerceError::InvalidQuantity(0).kind(), ErrorKind::InvalidInput);
        assert_eq!(
            CommerceError::ProductNotFound("p".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CommerceError::ItemNotInCart("p".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CommerceError::DatabaseError("down".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_db_error_converts_to_internal() {
        let err: CommerceError = shop_db::DbError::Unavailable("offline".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("offline"));
    }
}
