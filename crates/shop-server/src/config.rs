//! Service configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shop_commerce::cart::{PricingPolicy, MAX_QUANTITY_PER_ITEM};
use shop_observability::LoggingConfig;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "SHOPFRONT_CONFIG";

/// Contents of `shopfront.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Cart pricing, limits and cookie settings.
    #[serde(default)]
    pub cart: CartConfig,

    /// Catalog seeding.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Where cart records are persisted.
    #[serde(default)]
    pub store: StoreConfig,

    /// Read-through cache backend.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load config from a file.
    ///
    /// `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cart.max_quantity_per_item < 1 {
            bail!(
                "cart.max_quantity_per_item must be at least 1 (got {})",
                self.cart.max_quantity_per_item
            );
        }
        if self.cart.cookie_name.trim().is_empty()
            || !self
                .cart
                .cookie_name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            bail!("cart.cookie_name '{}' is not a valid cookie name", self.cart.cookie_name);
        }
        if let StoreConfig::Sqlite {
            url,
            max_connections,
        } = &self.store
        {
            if url.trim().is_empty() {
                bail!("store.url must not be empty");
            }
            if *max_connections < 1 {
                bail!("store.max_connections must be at least 1");
            }
        }
        if let CacheConfig::Redis { url } = &self.cache {
            if url.trim().is_empty() {
                bail!("cache.url must not be empty");
            }
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// The `[cart]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Tax rate in basis points.
    pub tax_rate_bps: u32,
    /// Shipping rate in basis points.
    pub shipping_rate_bps: u32,
    /// Per-line quantity ceiling.
    pub max_quantity_per_item: i64,
    /// Read-through cache entry lifetime.
    pub cache_ttl_secs: u64,
    /// Name of the anonymous cart cookie.
    pub cookie_name: String,
    /// Lifetime of a newly issued cookie.
    pub cookie_max_age_secs: u64,
    /// Mark the cookie `Secure`.
    pub cookie_secure: bool,
}

impl Default for CartConfig {
    fn default() -> Self {
        let pricing = PricingPolicy::default();
        Self {
            tax_rate_bps: pricing.tax_rate_bps,
            shipping_rate_bps: pricing.shipping_rate_bps,
            max_quantity_per_item: MAX_QUANTITY_PER_ITEM,
            cache_ttl_secs: 86_400,
            cookie_name: "cartCookieId".to_string(),
            cookie_max_age_secs: 30 * 24 * 60 * 60,
            cookie_secure: false,
        }
    }
}

impl CartConfig {
    /// Pricing policy for the engine.
    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate_bps: self.tax_rate_bps,
            shipping_rate_bps: self.shipping_rate_bps,
        }
    }

    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// The `[catalog]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON array of products. The demo catalog is used when unset.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// The `[store]` section, selected by `backend`.
///
/// ```toml
/// [store]
/// backend = "sqlite"
/// url = "sqlite://shopfront.db"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process document store. Carts do not survive a restart.
    Memory,
    /// SQLite database, created on first use.
    Sqlite {
        /// Connection URL.
        url: String,
        /// Pool size.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            url: "sqlite://shopfront.db".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

/// The `[cache]` section, selected by `backend`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CacheConfig {
    /// In-process cache.
    #[default]
    Memory,
    /// Redis server.
    Redis {
        /// Connection URL, e.g. `redis://127.0.0.1:6379`.
        url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_observability::LogFormat;

    #[test]
    fn test_empty_toml_is_default() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.cart.cookie_name, "cartCookieId");
        assert_eq!(config.cart.cookie_max_age_secs, 2_592_000);
        assert_eq!(config.cart.pricing(), PricingPolicy::default());
        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                url: "sqlite://shopfront.db".to_string(),
                max_connections: 5
            }
        );
        assert_eq!(config.cache, CacheConfig::Memory);
    }

    #[test]
    fn test_store_and_cache_backends() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [store]
            backend = "memory"

            [cache]
            backend = "redis"
            url = "redis://cache:6379"
            "#,
        )
        .unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(
            config.cache,
            CacheConfig::Redis {
                url: "redis://cache:6379".to_string()
            }
        );

        let config: ServiceConfig = toml::from_str(
            r#"
            [store]
            backend = "sqlite"
            url = "sqlite:///var/lib/shopfront/carts.db"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.store,
            StoreConfig::Sqlite { max_connections: 5, .. }
        ));

        assert!(toml::from_str::<ServiceConfig>("[store]\nbackend = \"mongo\"\n").is_err());
        assert!(toml::from_str::<ServiceConfig>("[cache]\nbackend = \"redis\"\n").is_err());
    }

    #[test]
    fn test_partial_sections() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [cart]
            tax_rate_bps = 800
            cookie_secure = true

            [catalog]
            seed_path = "catalog.json"

            [logging]
            format = "human"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.cart.tax_rate_bps, 800);
        assert_eq!(config.cart.shipping_rate_bps, 500);
        assert!(config.cart.cookie_secure);
        assert_eq!(config.catalog.seed_path, Some(PathBuf::from("catalog.json")));
        assert_eq!(config.logging.format, LogFormat::Human);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation() {
        let mut config = ServiceConfig::default();
        assert!(config.validate().is_ok());

        config.cart.max_quantity_per_item = 0;
        assert!(config.validate().is_err());

        config.cart.max_quantity_per_item = 10;
        config.cart.cookie_name = "bad name;".to_string();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.store = StoreConfig::Sqlite {
            url: "sqlite://carts.db".to_string(),
            max_connections: 0,
        };
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.cache = CacheConfig::Redis { url: " ".to_string() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = std::env::temp_dir().join(format!("shopfront-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let toml_path = dir.join("shopfront.toml");
        std::fs::write(&toml_path, "[cart]\ncache_ttl_secs = 60\n").unwrap();
        let config = ServiceConfig::load(&toml_path).unwrap();
        assert_eq!(config.cart.cache_ttl(), Duration::from_secs(60));

        let json_path = dir.join("shopfront.json");
        std::fs::write(&json_path, r#"{"cart":{"max_quantity_per_item":5}}"#).unwrap();
        let config = ServiceConfig::load(&json_path).unwrap();
        assert_eq!(config.cart.max_quantity_per_item, 5);

        assert!(ServiceConfig::load(dir.join("missing.toml")).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
