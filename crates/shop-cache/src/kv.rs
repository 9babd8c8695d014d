//! Key-Value store wrapper with automatic serialization.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::CacheError;

/// Raw byte-level cache backend.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the bytes stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store bytes under `key`, expiring after `ttl` if given.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process cache backend with per-entry expiry.
///
/// Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|e| e.values().filter(|v| !v.is_expired(now)).count())
            .unwrap_or(0)
    }

    /// Check if no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CacheError {
    CacheError::StoreError("cache lock poisoned".to_string())
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(|_| poisoned())?;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it.
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}

/// Backend that stores nothing. Every read is a miss.
///
/// Used when caching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[async_trait]
impl CacheBackend for NullBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Type-safe cache over a [`CacheBackend`].
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Option<Duration>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Create a cache over a backend.
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Create a cache over a shared backend.
    pub fn from_arc(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            default_ttl: None,
        }
    }

    /// A cache that never holds anything.
    pub fn disabled() -> Self {
        Self::new(NullBackend)
    }

    /// Set the TTL applied by [`Cache::set`].
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cart: Option<Cart> = cache.get("cart:cookie:sess_abc").await?;
    /// ```
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set a value using the default TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// Set a value with an explicit TTL (`None` never expires).
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.backend.set(key, bytes, ttl).await
    }

    /// Delete a value from the cache.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(key).await
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("cart", "user", user_id);
/// // Returns "cart:user:user123"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
        qty: i64,
    }

    fn item() -> Item {
        Item {
            name: "widget".to_string(),
            qty: 3,
        }
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = Cache::new(MemoryBackend::new());
        cache.set("k", &item()).await.unwrap();

        let got: Option<Item> = cache.get("k").await.unwrap();
        assert_eq!(got, Some(item()));

        cache.delete("k").await.unwrap();
        let got: Option<Item> = cache.get("k").await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = Cache::from_arc(backend.clone());
        cache
            .set_with_ttl("k", &item(), Some(Duration::ZERO))
            .await
            .unwrap();

        let got: Option<Item> = cache.get("k").await.unwrap();
        assert_eq!(got, None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_default_ttl_keeps_fresh_entries() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = Cache::from_arc(backend.clone()).with_default_ttl(Duration::from_secs(60));
        cache.set("k", &item()).await.unwrap();
        assert_eq!(backend.len(), 1);
        let got: Option<Item> = cache.get("k").await.unwrap();
        assert_eq!(got, Some(item()));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = Cache::disabled();
        cache.set("k", &item()).await.unwrap();
        let got: Option<Item> = cache.get("k").await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_serialize_error() {
        let cache = Cache::new(MemoryBackend::new());
        cache.set("k", &"just a string").await.unwrap();
        let err = cache.get::<Item>("k").await.unwrap_err();
        assert!(matches!(err, CacheError::SerializeError(_)));
    }

    #[test]
    fn test_cache_key_macro() {
        assert_eq!(cache_key!("cart", "user", "u1"), "cart:user:u1");
        assert_eq!(cache_key!("cart", 42), "cart:42");
    }
}
