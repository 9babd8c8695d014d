//! Product catalog module.
//!
//! The catalog is a read-only collaborator of the cart engine: it supplies
//! price, name, sale status and stock level by product id.

mod product;
mod store;

pub use product::Product;
pub use store::{Catalog, InMemoryCatalog};
