//! Cart persistence.

use async_trait::async_trait;
use shop_cache::SessionId;
use shop_db::{filter, Db, UniqueIndex};

use crate::cart::Cart;
use crate::error::CommerceError;
use crate::ids::UserId;

/// Collection holding one document per cart.
pub const CARTS_COLLECTION: &str = "carts";

/// Durable storage of cart records.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find the cart owned by an authenticated user.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, CommerceError>;

    /// Find the cart bound to an anonymous token.
    async fn find_by_cookie(&self, cookie_id: &SessionId) -> Result<Option<Cart>, CommerceError>;

    /// Persist a new cart.
    async fn insert(&self, cart: &Cart) -> Result<(), CommerceError>;

    /// Overwrite an existing cart, inserting it if it is not stored yet.
    async fn save(&self, cart: &Cart) -> Result<(), CommerceError>;
}

/// [`CartRepository`] over the document store.
#[derive(Debug, Clone)]
pub struct DocumentCartRepository {
    db: Db,
}

impl DocumentCartRepository {
    /// Wrap a database handle and declare the identity index.
    ///
    /// No two carts may share the same `(user_id, cookie_id)` pairing.
    pub async fn open(db: Db) -> Result<Self, CommerceError> {
        db.create_index(
            CARTS_COLLECTION,
            UniqueIndex::new("cart_identity", ["user_id", "cookie_id"]).sparse(),
        )
        .await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl CartRepository for DocumentCartRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, CommerceError> {
        Ok(self
            .db
            .find_one_as(CARTS_COLLECTION, &filter!["user_id" => user_id.as_str()])
            .await?)
    }

    async fn find_by_cookie(&self, cookie_id: &SessionId) -> Result<Option<Cart>, CommerceError> {
        Ok(self
            .db
            .find_one_as(CARTS_COLLECTION, &filter!["cookie_id" => cookie_id.as_str()])
            .await?)
    }

    async fn insert(&self, cart: &Cart) -> Result<(), CommerceError> {
        self.db.insert(CARTS_COLLECTION, cart).await?;
        Ok(())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CommerceError> {
        let replaced = self
            .db
            .replace(CARTS_COLLECTION, &filter!["id" => cart.id.as_str()], cart)
            .await?;
        if !replaced {
            self.db.insert(CARTS_COLLECTION, cart).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartIdentity;

    async fn repo() -> DocumentCartRepository {
        DocumentCartRepository::open(Db::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_find_by_user_and_cookie() {
        let repo = repo().await;
        let user_cart = Cart::new(&CartIdentity::user(UserId::new("u1")));
        let anon_cart = Cart::new(&CartIdentity::anonymous(SessionId::new("c1")));
        repo.insert(&user_cart).await.unwrap();
        repo.insert(&anon_cart).await.unwrap();

        let by_user = repo.find_by_user(&UserId::new("u1")).await.unwrap();
        assert_eq!(by_user.map(|c| c.id), Some(user_cart.id));
        let by_cookie = repo.find_by_cookie(&SessionId::new("c1")).await.unwrap();
        assert_eq!(by_cookie.map(|c| c.id), Some(anon_cart.id));

        assert!(repo.find_by_user(&UserId::new("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let repo = repo().await;
        let identity = CartIdentity::anonymous(SessionId::new("c1"));
        repo.insert(&Cart::new(&identity)).await.unwrap();

        let err = repo.insert(&Cart::new(&identity)).await.unwrap_err();
        assert!(matches!(err, CommerceError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_save_round_trips() {
        let repo = repo().await;
        let identity = CartIdentity::anonymous(SessionId::new("c1"));
        let mut cart = Cart::new(&identity);
        repo.save(&cart).await.unwrap();

        cart.txt = "changed".to_string();
        repo.save(&cart).await.unwrap();

        let loaded = repo
            .find_by_cookie(&SessionId::new("c1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, cart);
    }
}
