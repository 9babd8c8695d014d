//! Catalog product type.

use crate::ids::{CategoryId, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Full description.
    #[serde(default)]
    pub description: Option<String>,
    /// Primary image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Category this product belongs to.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Base price.
    pub price: Money,
    /// Units in stock.
    #[serde(default)]
    pub stock_quantity: i64,
    /// Whether the sale price applies.
    #[serde(default)]
    pub on_sale: bool,
    /// Sale price, used while `on_sale` is set.
    #[serde(default)]
    pub sale_price: Option<Money>,
}

impl Product {
    /// Create a product with a base price and no sale.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            image_url: None,
            category_id: None,
            price,
            stock_quantity: 0,
            on_sale: false,
            sale_price: None,
        }
    }

    /// Put the product on sale at `sale_price`.
    pub fn with_sale(mut self, sale_price: Money) -> Self {
        self.on_sale = true;
        self.sale_price = Some(sale_price);
        self
    }

    /// Set the stock level.
    pub fn with_stock(mut self, stock_quantity: i64) -> Self {
        self.stock_quantity = stock_quantity;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category_id: impl Into<CategoryId>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    /// The price a buyer pays for one unit right now.
    ///
    /// The sale price while on sale, otherwise the base price. A product
    /// flagged on sale without a sale price is charged the base price.
    pub fn unit_price(&self) -> Money {
        match (self.on_sale, self.sale_price) {
            (true, Some(sale)) => sale,
            _ => self.price,
        }
    }
}
