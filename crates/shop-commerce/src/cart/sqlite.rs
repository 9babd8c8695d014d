//! SQLite-backed cart storage.
//!
//! One row per cart. The full record lives in the `document` column as JSON;
//! `user_id` and `cookie_id` are copied out beside it so lookups can use an
//! index and the identity pairing can carry a unique constraint.

use std::str::FromStr;

use async_trait::async_trait;
use shop_cache::SessionId;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::cart::{Cart, CartRepository};
use crate::error::CommerceError;
use crate::ids::UserId;

/// [`CartRepository`] over a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteCartRepository {
    pool: SqlitePool,
}

impl SqliteCartRepository {
    /// Wrap an existing pool. Call [`init_schema`](Self::init_schema) before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `url`, creating the file if needed, and make
    /// sure the schema exists.
    ///
    /// ```rust,ignore
    /// let carts = SqliteCartRepository::connect("sqlite://shopfront.db", 5).await?;
    /// ```
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, CommerceError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self::new(pool);
        repo.init_schema().await?;
        tracing::info!(url, max_connections, "cart database ready");
        Ok(repo)
    }

    /// Create the carts table and its indexes if they are missing.
    ///
    /// No two carts may share the same `(user_id, cookie_id)` pairing. A cart
    /// with neither key is not constrained.
    pub async fn init_schema(&self) -> Result<(), CommerceError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS carts (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                cookie_id TEXT,
                document TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS carts_identity
                ON carts (COALESCE(user_id, ''), COALESCE(cookie_id, ''))
                WHERE user_id IS NOT NULL OR cookie_id IS NOT NULL",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS carts_user_id ON carts (user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS carts_cookie_id ON carts (cookie_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_where(&self, sql: &str, key: &str) -> Result<Option<Cart>, CommerceError> {
        let document: Option<String> = sqlx::query_scalar(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match document {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CartRepository for SqliteCartRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, CommerceError> {
        self.find_where(
            "SELECT document FROM carts WHERE user_id = ? ORDER BY rowid LIMIT 1",
            user_id.as_str(),
        )
        .await
    }

    async fn find_by_cookie(&self, cookie_id: &SessionId) -> Result<Option<Cart>, CommerceError> {
        self.find_where(
            "SELECT document FROM carts WHERE cookie_id = ? ORDER BY rowid LIMIT 1",
            cookie_id.as_str(),
        )
        .await
    }

    async fn insert(&self, cart: &Cart) -> Result<(), CommerceError> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, cookie_id, document, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(cart.id.as_str())
        .bind(cart.user_id.as_ref().map(UserId::as_str))
        .bind(cart.cookie_id.as_ref().map(SessionId::as_str))
        .bind(serde_json::to_string(cart)?)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CommerceError> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, cookie_id, document, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                user_id = excluded.user_id,
                cookie_id = excluded.cookie_id,
                document = excluded.document,
                updated_at = excluded.updated_at",
        )
        .bind(cart.id.as_str())
        .bind(cart.user_id.as_ref().map(UserId::as_str))
        .bind(cart.cookie_id.as_ref().map(SessionId::as_str))
        .bind(serde_json::to_string(cart)?)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartIdentity;
    use crate::catalog::Product;
    use crate::money::Money;

    async fn repo() -> SqliteCartRepository {
        let options = SqliteConnectOptions::new().filename(":memory:");
        // One connection that never retires, so the in-memory database lives
        // as long as the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        let repo = SqliteCartRepository::new(pool);
        repo.init_schema().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_find_by_user_and_cookie() {
        let repo = repo().await;
        let user_cart = Cart::new(&CartIdentity::user(UserId::new("u1")));
        let anon_cart = Cart::new(&CartIdentity::anonymous(SessionId::new("c1")));
        repo.insert(&user_cart).await.unwrap();
        repo.insert(&anon_cart).await.unwrap();

        let by_user = repo.find_by_user(&UserId::new("u1")).await.unwrap();
        assert_eq!(by_user, Some(user_cart));
        let by_cookie = repo.find_by_cookie(&SessionId::new("c1")).await.unwrap();
        assert_eq!(by_cookie, Some(anon_cart));

        assert!(repo.find_by_user(&UserId::new("u2")).await.unwrap().is_none());
        assert!(repo.find_by_cookie(&SessionId::new("c2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let repo = repo().await;
        let identity = CartIdentity::anonymous(SessionId::new("c1"));
        repo.insert(&Cart::new(&identity)).await.unwrap();

        let err = repo.insert(&Cart::new(&identity)).await.unwrap_err();
        assert!(matches!(err, CommerceError::DatabaseError(_)));

        // Same token under a different user is a different pairing.
        let paired = CartIdentity::user(UserId::new("u1")).with_cookie(SessionId::new("c1"));
        repo.insert(&Cart::new(&paired)).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_upserts_and_updates_identity() {
        let repo = repo().await;
        let mut cart = Cart::new(&CartIdentity::user(UserId::new("u1")));
        repo.save(&cart).await.unwrap();

        let mug = Product::new("p1", "Mug", Money::usd(1000));
        cart.add_item(&mug, 2, 10).unwrap();
        cart.cookie_id = Some(SessionId::new("c9"));
        repo.save(&cart).await.unwrap();

        let loaded = repo
            .find_by_cookie(&SessionId::new("c9"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, cart);
        assert_eq!(loaded.products.len(), 1);
    }

    #[tokio::test]
    async fn test_carts_survive_reconnect() {
        let path = std::env::temp_dir().join(format!("shopfront-carts-{}.db", std::process::id()));
        let url = format!("sqlite://{}", path.display());
        let cart = Cart::new(&CartIdentity::anonymous(SessionId::new("c1")));

        {
            let repo = SqliteCartRepository::connect(&url, 1).await.unwrap();
            repo.insert(&cart).await.unwrap();
            repo.pool.close().await;
        }

        let repo = SqliteCartRepository::connect(&url, 1).await.unwrap();
        let loaded = repo.find_by_cookie(&SessionId::new("c1")).await.unwrap();
        assert_eq!(loaded, Some(cart));
        repo.pool.close().await;
        std::fs::remove_file(&path).unwrap();
    }
}
