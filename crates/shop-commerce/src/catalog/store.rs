//! Product lookup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::catalog::Product;
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;

/// Read-only product source consumed by the cart engine.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up a product by id.
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, CommerceError>;
}

/// Catalog held in memory.
///
/// The engine only reads from it; the owner may [`upsert`](Self::upsert)
/// products to reflect price or sale changes.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of products. Later duplicates win.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: RwLock::new(products),
        }
    }

    /// Parse a JSON array of products.
    pub fn from_json_str(json: &str) -> Result<Self, CommerceError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Ok(Self::from_products(products))
    }

    /// Load a JSON array of products from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CommerceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommerceError::CatalogUnavailable(format!(
                "failed to read catalog seed {}: {e}",
                path.display()
            ))
        })?;
        let catalog = Self::from_json_str(&content)?;
        tracing::info!(path = %path.display(), products = catalog.len(), "loaded catalog seed");
        Ok(catalog)
    }

    /// Built-in demo catalog used when no seed file is configured.
    pub fn demo() -> Self {
        Self::from_products([
            Product::new("prod-laptop-pro", "Premium Laptop Pro", Money::usd(129_900))
                .with_description("High-performance laptop for professionals and creators.")
                .with_category("electronics")
                .with_stock(15)
                .with_sale(Money::usd(109_900)),
            Product::new("prod-headphones", "Wireless Headphones", Money::usd(29_900))
                .with_description("Wireless headphones with noise cancellation.")
                .with_category("electronics")
                .with_stock(8)
                .with_sale(Money::usd(24_900)),
            Product::new("prod-speaker", "Smart Home Speaker", Money::usd(19_900))
                .with_description("Voice-controlled speaker for the connected home.")
                .with_category("electronics")
                .with_stock(3),
            Product::new("prod-office-chair", "Designer Office Chair", Money::usd(59_900))
                .with_description("Ergonomic office chair with premium materials.")
                .with_category("furniture")
                .with_stock(12),
        ])
    }

    /// Insert or replace a product.
    pub fn upsert(&self, product: Product) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.id.clone(), product);
        }
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Check if the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, CommerceError> {
        let products = self
            .products
            .read()
            .map_err(|_| CommerceError::DatabaseError("catalog lock poisoned".to_string()))?;
        Ok(products.get(id).cloned())
    }
}
