//! Shared application state.

use std::sync::Arc;

use anyhow::{Context, Result};
use shop_cache::{Cache, CacheBackend, MemoryBackend, RedisBackend};
use shop_commerce::cart::{
    CartEngine, CartRepository, DocumentCartRepository, SqliteCartRepository,
};
use shop_commerce::catalog::InMemoryCatalog;
use shop_db::Db;

use crate::config::{CacheConfig, ServiceConfig, StoreConfig};
use crate::identity::CookieSettings;
use crate::notify::ConnectionRegistry;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Cart operations.
    pub engine: Arc<CartEngine>,
    /// Anonymous cart cookie handling.
    pub cookies: CookieSettings,
    /// Live notification connections.
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Assemble state from parts.
    pub fn new(
        engine: Arc<CartEngine>,
        cookies: CookieSettings,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            engine,
            cookies,
            connections,
        }
    }

    /// Build the service from config: seeded catalog, the configured cart
    /// store and cache backend, and the connection registry.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let catalog = match &config.catalog.seed_path {
            Some(path) => InMemoryCatalog::from_json_file(path)
                .with_context(|| format!("Failed to load catalog: {}", path.display()))?,
            None => InMemoryCatalog::demo(),
        };
        tracing::info!(products = catalog.len(), "catalog ready");

        let carts = open_store(&config.store).await?;
        let cache = Cache::from_arc(open_cache(&config.cache).await?)
            .with_default_ttl(config.cart.cache_ttl());
        let connections = Arc::new(ConnectionRegistry::new());

        let engine = CartEngine::new(Arc::new(catalog), carts)
            .with_cache(cache)
            .with_emitter(connections.clone())
            .with_pricing(config.cart.pricing())
            .with_max_quantity(config.cart.max_quantity_per_item);

        Ok(Self::new(
            Arc::new(engine),
            CookieSettings::from_config(&config.cart),
            connections,
        ))
    }
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CartRepository>> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("using the in-memory cart store, carts will not survive a restart");
            let carts = DocumentCartRepository::open(Db::in_memory())
                .await
                .context("Failed to open cart store")?;
            Ok(Arc::new(carts))
        }
        StoreConfig::Sqlite {
            url,
            max_connections,
        } => {
            let carts = SqliteCartRepository::connect(url, *max_connections)
                .await
                .with_context(|| format!("Failed to open cart database: {url}"))?;
            Ok(Arc::new(carts))
        }
    }
}

async fn open_cache(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
    match config {
        CacheConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
        CacheConfig::Redis { url } => {
            let backend = RedisBackend::connect(url)
                .await
                .context("Failed to connect to the redis cache")?;
            Ok(Arc::new(backend))
        }
    }
}
