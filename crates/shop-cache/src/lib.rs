//! Read-through key-value cache for the shopfront cart service.
//!
//! Values are stored as JSON with an optional time-to-live, either in process
//! ([`MemoryBackend`]) or in Redis ([`RedisBackend`]). The cache is best
//! effort: callers treat every error as a miss.
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_cache::{cache_key, Cache, MemoryBackend};
//! use std::time::Duration;
//!
//! let cache = Cache::new(MemoryBackend::new()).with_default_ttl(Duration::from_secs(86_400));
//!
//! let key = cache_key!("cart", "cookie", session_id);
//! cache.set(&key, &cart).await?;
//! let cart: Option<Cart> = cache.get(&key).await?;
//! cache.delete(&key).await?;
//! ```

mod error;
mod kv;
mod redis_backend;
mod session;

pub use error::CacheError;
pub use kv::{Cache, CacheBackend, MemoryBackend, NullBackend};
pub use redis_backend::RedisBackend;
pub use session::SessionId;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        cache_key, Cache, CacheBackend, CacheError, MemoryBackend, NullBackend, RedisBackend,
        SessionId,
    };
}
