//! Cart domain for the shopfront service.
//!
//! - **Catalog**: read-only product lookup
//! - **Cart**: cart records, line snapshots and totals
//! - **Engine**: the cart operations, persistence and cache coherence
//! - **Events**: change notifications published after each mutation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shop_commerce::prelude::*;
//!
//! let carts = DocumentCartRepository::open(shop_db::Db::in_memory()).await?;
//! let engine = CartEngine::new(Arc::new(InMemoryCatalog::demo()), Arc::new(carts));
//!
//! let identity = CartIdentity::anonymous(SessionId::new("c1"));
//! let outcome = engine
//!     .add_to_cart(&identity, &ProductId::new("prod-headphones"), 2)
//!     .await?;
//! println!("{}", outcome.cart.txt);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod events;

pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Currency, Money};
pub use shop_cache::SessionId;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};
    pub use shop_cache::SessionId;

    pub use crate::catalog::{Catalog, InMemoryCatalog, Product};

    pub use crate::cart::{
        Cart, CartEngine, CartIdentity, CartLineItem, CartOutcome, CartRepository, CartTotals,
        CookieDirective, DocumentCartRepository, PricingPolicy, SqliteCartRepository,
        MAX_QUANTITY_PER_ITEM,
    };

    pub use crate::events::{CartEvent, CartEventKind, NotificationEmitter, NullEmitter};
}
