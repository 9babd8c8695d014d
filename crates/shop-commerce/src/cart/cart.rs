//! Cart and line item types.

use serde::{Deserialize, Serialize};
use shop_cache::SessionId;

use crate::cart::{CartIdentity, CartTotals, PricingPolicy};
use crate::catalog::Product;
use crate::error::CommerceError;
use crate::ids::{CartId, CategoryId, ProductId, UserId};
use crate::money::{Currency, Money};

/// Default maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// A shopping cart.
///
/// `total_quantity`, `total_price` and `txt` are derived from `products` and
/// are rewritten together by [`Cart::recalculate`] after every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// User ID for authenticated carts.
    pub user_id: Option<UserId>,
    /// Anonymous session token.
    pub cookie_id: Option<SessionId>,
    /// Lines in the cart, at most one per product.
    pub products: Vec<CartLineItem>,
    /// Sum of line quantities.
    pub total_quantity: i64,
    /// Grand total including tax and shipping.
    pub total_price: Money,
    /// Readable breakdown of the totals.
    pub txt: String,
    /// False only for carts deactivated outside normal operation.
    pub is_active: bool,
    /// Cart currency.
    pub currency: Currency,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Cart {
    /// Create an empty cart owned by `identity`.
    pub fn new(identity: &CartIdentity) -> Self {
        let now = current_timestamp();
        Self {
            id: CartId::generate(),
            user_id: identity.user_id.clone(),
            cookie_id: identity.cookie_id.clone(),
            products: Vec::new(),
            total_quantity: 0,
            total_price: Money::zero(Currency::USD),
            txt: String::new(),
            is_active: true,
            currency: Currency::USD,
            created_at: now,
            updated_at: now,
        }
    }

    /// The identity this cart belongs to.
    pub fn identity(&self) -> CartIdentity {
        CartIdentity {
            user_id: self.user_id.clone(),
            cookie_id: self.cookie_id.clone(),
        }
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line grows by `quantity` (never below 1) and takes a fresh
    /// snapshot of the product. Otherwise a new line is appended.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        max_quantity: i64,
    ) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        if let Some(existing) = self.line_mut(&product.id) {
            let new_quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::Overflow)?
                .max(1);
            if new_quantity > max_quantity {
                return Err(CommerceError::QuantityExceedsLimit(new_quantity, max_quantity));
            }
            existing.refresh(product);
            existing.quantity = new_quantity;
        } else {
            if quantity > max_quantity {
                return Err(CommerceError::QuantityExceedsLimit(quantity, max_quantity));
            }
            self.products.push(CartLineItem::snapshot(product, quantity));
        }

        self.touch();
        Ok(())
    }

    /// Replace the quantity of `product`'s line, appending it if missing.
    ///
    /// The touched line takes a fresh snapshot of the product.
    pub fn set_quantity(
        &mut self,
        product: &Product,
        quantity: i64,
        max_quantity: i64,
    ) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity > max_quantity {
            return Err(CommerceError::QuantityExceedsLimit(quantity, max_quantity));
        }

        if let Some(existing) = self.line_mut(&product.id) {
            existing.refresh(product);
            existing.quantity = quantity;
        } else {
            self.products.push(CartLineItem::snapshot(product, quantity));
        }

        self.touch();
        Ok(())
    }

    /// Remove the line for `product_id`.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let len_before = self.products.len();
        self.products.retain(|l| &l.product_id != product_id);
        let removed = self.products.len() < len_before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Drop every line and zero the totals. The cart stays active.
    pub fn clear(&mut self) {
        self.products.clear();
        self.total_quantity = 0;
        self.total_price = Money::zero(self.currency);
        self.txt.clear();
        self.is_active = true;
        self.touch();
    }

    /// Recompute totals over the full line set.
    ///
    /// Lines with a non-positive quantity are dropped first.
    pub fn recalculate(&mut self, policy: &PricingPolicy) -> Result<CartTotals, CommerceError> {
        self.products.retain(|l| l.quantity > 0);
        let totals = policy.compute(&self.products, self.currency)?;
        self.total_quantity = totals.total_quantity;
        self.total_price = totals.total;
        self.txt = totals.summary();
        Ok(totals)
    }

    /// Get the line for a product.
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLineItem> {
        self.products.iter().find(|l| &l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLineItem> {
        self.products.iter_mut().find(|l| &l.product_id == product_id)
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Get number of distinct lines.
    pub fn unique_item_count(&self) -> usize {
        self.products.len()
    }

    fn touch(&mut self) {
        self.updated_at = current_timestamp();
    }
}

/// One product-and-quantity entry in a cart.
///
/// Product attributes are a snapshot taken when the line was last written,
/// not a live view of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLineItem {
    /// Catalog product.
    pub product_id: ProductId,
    /// Product name.
    pub name: String,
    /// Product image.
    pub image_url: Option<String>,
    /// Product description.
    pub description: Option<String>,
    /// Product category.
    pub category_id: Option<CategoryId>,
    /// Stock level at snapshot time.
    pub stock_quantity: i64,
    /// Sale flag at snapshot time.
    pub on_sale: bool,
    /// Sale price at snapshot time.
    pub sale_price: Option<Money>,
    /// Units in the cart, always at least 1.
    pub quantity: i64,
    /// Unit price charged.
    pub price: Money,
}

impl CartLineItem {
    /// Snapshot `product` into a new line at its current unit price.
    pub fn snapshot(product: &Product, quantity: i64) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            description: product.description.clone(),
            category_id: product.category_id.clone(),
            stock_quantity: product.stock_quantity,
            on_sale: product.on_sale,
            sale_price: product.sale_price,
            quantity,
            price: product.unit_price(),
        }
    }

    /// Overwrite the snapshot fields from `product`, keeping the quantity.
    pub fn refresh(&mut self, product: &Product) {
        let quantity = self.quantity;
        *self = Self::snapshot(product, quantity);
    }
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mug() -> Product {
        Product::new("p1", "Mug", Money::usd(1000))
    }

    fn lamp() -> Product {
        Product::new("p2", "Lamp", Money::usd(10_000)).with_sale(Money::usd(8000))
    }

    fn new_cart() -> Cart {
        Cart::new(&CartIdentity::anonymous(SessionId::new("c1")))
    }

    #[test]
    fn test_cart_creation() {
        let cart = new_cart();
        assert!(cart.is_empty());
        assert!(cart.is_active);
        assert_eq!(cart.cookie_id, Some(SessionId::new("c1")));
        assert_eq!(cart.user_id, None);
    }

    #[test]
    fn test_add_same_item_increases_quantity() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 2, MAX_QUANTITY_PER_ITEM).unwrap();
        cart.add_item(&mug(), 3, MAX_QUANTITY_PER_ITEM).unwrap();

        assert_eq!(cart.unique_item_count(), 1);
        assert_eq!(cart.line(&ProductId::new("p1")).map(|l| l.quantity), Some(5));
    }

    #[test]
    fn test_add_snapshots_sale_price() {
        let mut cart = new_cart();
        cart.add_item(&lamp(), 1, MAX_QUANTITY_PER_ITEM).unwrap();
        let line = cart.line(&ProductId::new("p2")).unwrap();
        assert_eq!(line.price, Money::usd(8000));
        assert!(line.on_sale);
    }

    #[test]
    fn test_add_refreshes_touched_line_only() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 1, MAX_QUANTITY_PER_ITEM).unwrap();
        cart.add_item(&lamp(), 1, MAX_QUANTITY_PER_ITEM).unwrap();

        let repriced_mug = Product::new("p1", "Mug", Money::usd(1500));
        cart.add_item(&repriced_mug, 1, MAX_QUANTITY_PER_ITEM).unwrap();

        assert_eq!(cart.line(&ProductId::new("p1")).map(|l| l.price), Some(Money::usd(1500)));
        assert_eq!(cart.line(&ProductId::new("p2")).map(|l| l.price), Some(Money::usd(8000)));
    }

    #[test]
    fn test_invalid_quantity() {
        let mut cart = new_cart();
        assert!(matches!(
            cart.add_item(&mug(), 0, MAX_QUANTITY_PER_ITEM),
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert!(matches!(
            cart.set_quantity(&mug(), -2, MAX_QUANTITY_PER_ITEM),
            Err(CommerceError::InvalidQuantity(-2))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 5, 10).unwrap();
        let err = cart.add_item(&mug(), 6, 10).unwrap_err();
        assert!(matches!(err, CommerceError::QuantityExceedsLimit(11, 10)));
        assert_eq!(cart.line(&ProductId::new("p1")).map(|l| l.quantity), Some(5));
    }

    #[test]
    fn test_set_quantity_replaces() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 5, MAX_QUANTITY_PER_ITEM).unwrap();
        cart.set_quantity(&mug(), 2, MAX_QUANTITY_PER_ITEM).unwrap();
        assert_eq!(cart.line(&ProductId::new("p1")).map(|l| l.quantity), Some(2));
    }

    #[test]
    fn test_set_quantity_appends_with_sale_price() {
        let mut cart = new_cart();
        cart.set_quantity(&lamp(), 1, MAX_QUANTITY_PER_ITEM).unwrap();
        assert_eq!(cart.line(&ProductId::new("p2")).map(|l| l.price), Some(Money::usd(8000)));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 1, MAX_QUANTITY_PER_ITEM).unwrap();
        assert!(cart.remove_item(&ProductId::new("p1")));
        assert!(!cart.remove_item(&ProductId::new("p1")));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_recalculate_sets_all_derived_fields() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 2, MAX_QUANTITY_PER_ITEM).unwrap();
        cart.add_item(&lamp(), 1, MAX_QUANTITY_PER_ITEM).unwrap();
        cart.recalculate(&PricingPolicy::default()).unwrap();

        // subtotal 100.00 -> total 117.00
        assert_eq!(cart.total_quantity, 3);
        assert_eq!(cart.total_price, Money::usd(11_700));
        assert_eq!(
            cart.txt,
            "Subtotal: $100.00, Tax: $12.00, Shipping: $5.00, Total: $117.00"
        );
    }

    #[test]
    fn test_recalculate_drops_non_positive_lines() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 1, MAX_QUANTITY_PER_ITEM).unwrap();
        if let Some(line) = cart.products.first_mut() {
            line.quantity = 0;
        }
        cart.recalculate(&PricingPolicy::default()).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_quantity, 0);
    }

    #[test]
    fn test_clear() {
        let mut cart = new_cart();
        cart.add_item(&mug(), 1, MAX_QUANTITY_PER_ITEM).unwrap();
        cart.recalculate(&PricingPolicy::default()).unwrap();
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.total_price, Money::usd(0));
        assert_eq!(cart.total_quantity, 0);
        assert_eq!(cart.txt, "");
        assert!(cart.is_active);
    }
}
