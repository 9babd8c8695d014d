//! Shopping carts.
//!
//! Record types, pricing, persistence and the [`CartEngine`] that ties them
//! together.

mod cart;
mod engine;
mod identity;
mod locks;
mod pricing;
mod repository;
mod sqlite;

pub use cart::{Cart, CartLineItem, MAX_QUANTITY_PER_ITEM};
pub use engine::{CartEngine, CartOutcome, CookieDirective};
pub use identity::CartIdentity;
pub use locks::IdentityLocks;
pub use pricing::{CartTotals, PricingPolicy};
pub use repository::{CartRepository, DocumentCartRepository, CARTS_COLLECTION};
pub use sqlite::SqliteCartRepository;
