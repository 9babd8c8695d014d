//! Cart change events.
//!
//! The engine publishes an event after each successful mutation. Delivery is
//! fire-and-forget: an emitter must not block and cannot fail the operation.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartIdentity};
use crate::ids::{CartId, ProductId};
use crate::money::Money;

/// What happened to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEventKind {
    /// A cart was created by the first add.
    Created,
    /// Units were added to an existing cart.
    Updated,
    /// A line's quantity was replaced.
    QuantitySet,
    /// A line was removed.
    LineRemoved,
    /// All lines were removed.
    Emptied,
}

/// A state change of one cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEvent {
    /// What happened.
    pub kind: CartEventKind,
    /// Affected cart.
    pub cart_id: CartId,
    /// Owner of the cart.
    pub identity: CartIdentity,
    /// Product the change was about, if any.
    pub product_id: Option<ProductId>,
    /// Cart quantity after the change.
    pub total_quantity: i64,
    /// Cart total after the change.
    pub total_price: Money,
}

impl CartEvent {
    /// Describe `cart` after a change.
    pub fn new(kind: CartEventKind, cart: &Cart, product_id: Option<&ProductId>) -> Self {
        Self {
            kind,
            cart_id: cart.id.clone(),
            identity: cart.identity(),
            product_id: product_id.cloned(),
            total_quantity: cart.total_quantity,
            total_price: cart.total_price,
        }
    }
}

/// Sink for cart events.
pub trait NotificationEmitter: Send + Sync {
    /// Publish an event.
    fn emit(&self, event: CartEvent);
}

/// Emitter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl NotificationEmitter for NullEmitter {
    fn emit(&self, _event: CartEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_cache::SessionId;

    #[test]
    fn test_event_snapshot_of_cart() {
        let cart = Cart::new(&CartIdentity::anonymous(SessionId::new("c1")));
        let event = CartEvent::new(CartEventKind::Emptied, &cart, None);
        assert_eq!(event.cart_id, cart.id);
        assert_eq!(event.identity.cookie_id, Some(SessionId::new("c1")));
        assert_eq!(event.total_quantity, 0);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CartEventKind::QuantitySet).unwrap(),
            r#""quantity_set""#
        );
    }
}
