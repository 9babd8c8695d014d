//! Redis cache backend.
//!
//! Values are written with `SET ... EX`, so Redis expires them on its own;
//! reads are plain `GET` and invalidation is `DEL`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::{CacheBackend, CacheError};

/// [`CacheBackend`] over a Redis server.
///
/// The connection manager reconnects on its own after a dropped connection,
/// and clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend").finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connect to the server at `url`, e.g. `redis://127.0.0.1:6379`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)
            .map_err(|e| CacheError::StoreError(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::StoreError(format!("failed to connect to redis: {e}")))?;
        tracing::info!("connected to redis cache");
        Ok(Self { conn })
    }
}

/// Whole seconds for `EX`, rounded up. `None` means the value is already
/// expired.
fn expiry_secs(ttl: Duration) -> Option<u64> {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    (secs > 0).then_some(secs)
}

fn store_error(op: &str, e: redis::RedisError) -> CacheError {
    CacheError::StoreError(format!("redis {op} failed: {e}"))
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| store_error("GET", e))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl.map(expiry_secs) {
            None => conn.set(key, value).await.map_err(|e| store_error("SET", e)),
            Some(Some(secs)) => conn
                .set_ex(key, value, secs)
                .await
                .map_err(|e| store_error("SET", e)),
            Some(None) => conn.del(key).await.map_err(|e| store_error("DEL", e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del(key).await.map_err(|e| store_error("DEL", e))
    }
}
