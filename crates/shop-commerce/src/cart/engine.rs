//! The cart engine.
//!
//! Owns every read-modify-write of cart records. Each mutation:
//!
//! 1. validates its input,
//! 2. locks every key of the caller and of the cart it resolves to,
//! 3. loads the cart (user first, then token),
//! 4. applies the change and recomputes totals over the full line set,
//! 5. persists the record, then
//! 6. invalidates or refreshes the cache and publishes a [`CartEvent`].
//!
//! A store failure aborts the operation before anything else happens, so the
//! previously persisted cart stays authoritative. Cache failures are logged
//! and ignored.
//!
//! A cache entry `cart:user:<id>` only ever holds the cart the user lookup
//! returns, and `cart:cookie:<token>` the cart the token lookup returns. Both
//! are keys of that cart's own identity, so clearing the stored cart's keys on
//! a mutation reaches every entry a reader could have filled.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use shop_cache::{cache_key, Cache, SessionId};
use tokio::sync::OwnedMutexGuard;

use crate::cart::{
    Cart, CartIdentity, CartRepository, IdentityLocks, PricingPolicy, MAX_QUANTITY_PER_ITEM,
};
use crate::catalog::{Catalog, Product};
use crate::error::CommerceError;
use crate::events::{CartEvent, CartEventKind, NotificationEmitter, NullEmitter};
use crate::ids::{ProductId, UserId};
use crate::money::Money;

/// What the caller should do with the identity cookie after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    /// Leave the cookie as it is.
    Keep,
    /// (Re)issue the cookie with this token.
    Issue(SessionId),
    /// Remove the cookie.
    Clear,
}

/// Result of a cart mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CartOutcome {
    /// The cart as persisted.
    pub cart: Cart,
    /// True if this call created the cart record.
    pub created: bool,
    /// Cookie handling for the caller.
    pub cookie: CookieDirective,
}

/// Guards over every identity key a mutation touches.
type KeyGuards = Vec<OwnedMutexGuard<()>>;

/// A stored cart with the cache key of the lookup that found it.
struct Located {
    cart: Cart,
    cache_key: String,
}

/// Cart lifecycle and total computation.
pub struct CartEngine {
    catalog: Arc<dyn Catalog>,
    carts: Arc<dyn CartRepository>,
    cache: Cache,
    emitter: Arc<dyn NotificationEmitter>,
    pricing: PricingPolicy,
    max_quantity: i64,
    locks: IdentityLocks,
}

impl std::fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEngine")
            .field("pricing", &self.pricing)
            .field("max_quantity", &self.max_quantity)
            .finish_non_exhaustive()
    }
}

impl CartEngine {
    /// Create an engine with no cache, no event sink and default pricing.
    pub fn new(catalog: Arc<dyn Catalog>, carts: Arc<dyn CartRepository>) -> Self {
        Self {
            catalog,
            carts,
            cache: Cache::disabled(),
            emitter: Arc::new(NullEmitter),
            pricing: PricingPolicy::default(),
            max_quantity: MAX_QUANTITY_PER_ITEM,
            locks: IdentityLocks::new(),
        }
    }

    /// Use a read-through cache.
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = cache;
        self
    }

    /// Publish cart events to `emitter`.
    pub fn with_emitter(mut self, emitter: Arc<dyn NotificationEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Override tax and shipping rates.
    pub fn with_pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    /// Override the per-line quantity ceiling.
    pub fn with_max_quantity(mut self, max_quantity: i64) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    /// The active pricing policy.
    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Add `quantity` units of a product, creating the cart on first use.
    ///
    /// An identity without a token is given a freshly generated one, which
    /// the caller must hand back to the client.
    pub async fn add_to_cart(
        &self,
        identity: &CartIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartOutcome, CommerceError> {
        validate_product_id(product_id)?;
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let mut identity = identity.clone();
        let token = match &identity.cookie_id {
            Some(token) => token.clone(),
            None => {
                let token = SessionId::generate();
                identity.cookie_id = Some(token.clone());
                token
            }
        };

        let (_guards, located) = self.lock_cart(&identity).await?;
        if let Some(located) = located {
            tracing::debug!(cart_id = %located.cart.id, identity = %identity, "cart exists, adding to it");
            return self.update_cart(&identity, located, product_id, quantity).await;
        }

        let product = self.product(product_id).await?;
        let mut cart = Cart::new(&identity);
        cart.add_item(&product, quantity, self.max_quantity)?;
        cart.recalculate(&self.pricing)?;
        self.carts.insert(&cart).await?;
        self.invalidate(&identity, &cart).await;

        tracing::info!(
            cart_id = %cart.id,
            identity = %identity,
            product_id = %product.id,
            quantity,
            total_cents = cart.total_price.amount_cents,
            "created cart"
        );
        audit("CREATE_CART", &identity, &cart, &product.name);
        self.emitter
            .emit(CartEvent::new(CartEventKind::Created, &cart, Some(product_id)));

        Ok(CartOutcome {
            cart,
            created: true,
            cookie: CookieDirective::Issue(token),
        })
    }

    /// Additive path for an add against an existing cart.
    async fn update_cart(
        &self,
        identity: &CartIdentity,
        located: Located,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartOutcome, CommerceError> {
        let Located { mut cart, cache_key } = located;
        let product = self.product(product_id).await?;
        if cart.cookie_id.is_none() {
            cart.cookie_id = identity.cookie_id.clone();
        }
        cart.add_item(&product, quantity, self.max_quantity)?;
        cart.recalculate(&self.pricing)?;
        self.carts.save(&cart).await?;
        self.invalidate(identity, &cart).await;
        self.fill_cache(&cache_key, &cart).await;

        tracing::info!(
            cart_id = %cart.id,
            identity = %identity,
            product_id = %product.id,
            quantity,
            total_cents = cart.total_price.amount_cents,
            "added to cart"
        );
        audit("UPDATE_CART", identity, &cart, &product.name);
        self.emitter
            .emit(CartEvent::new(CartEventKind::Updated, &cart, Some(product_id)));

        let cookie = cart
            .cookie_id
            .clone()
            .map_or(CookieDirective::Keep, CookieDirective::Issue);
        Ok(CartOutcome {
            cart,
            created: false,
            cookie,
        })
    }

    /// Replace a line's quantity, appending the line if it is missing.
    ///
    /// Zero is rejected; use [`remove_line`](Self::remove_line) instead. A
    /// known identity without a cart gets one created here.
    pub async fn set_quantity(
        &self,
        identity: &CartIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartOutcome, CommerceError> {
        validate_product_id(product_id)?;
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if identity.is_empty() {
            return Err(CommerceError::CartNotFound("no cart identity".to_string()));
        }

        let (_guards, located) = self.lock_cart(identity).await?;
        let (mut cart, created) = match located {
            Some(located) => (located.cart, false),
            None => (Cart::new(identity), true),
        };

        let product = self.product(product_id).await?;
        cart.set_quantity(&product, quantity, self.max_quantity)?;
        cart.recalculate(&self.pricing)?;
        if created {
            self.carts.insert(&cart).await?;
        } else {
            self.carts.save(&cart).await?;
        }
        self.invalidate(identity, &cart).await;

        tracing::info!(
            cart_id = %cart.id,
            identity = %identity,
            product_id = %product.id,
            quantity,
            total_cents = cart.total_price.amount_cents,
            "set line quantity"
        );
        audit("SET_QUANTITY", identity, &cart, &product.name);
        let kind = if created {
            CartEventKind::Created
        } else {
            CartEventKind::QuantitySet
        };
        self.emitter.emit(CartEvent::new(kind, &cart, Some(product_id)));

        Ok(CartOutcome {
            cart,
            created,
            cookie: CookieDirective::Keep,
        })
    }

    /// Remove a product's line.
    pub async fn remove_line(
        &self,
        identity: &CartIdentity,
        product_id: &ProductId,
    ) -> Result<CartOutcome, CommerceError> {
        validate_product_id(product_id)?;

        let (_guards, mut cart) = self.existing_cart(identity).await?;
        if !cart.remove_item(product_id) {
            return Err(CommerceError::ItemNotInCart(product_id.to_string()));
        }
        cart.recalculate(&self.pricing)?;
        self.carts.save(&cart).await?;
        self.invalidate(identity, &cart).await;

        tracing::info!(
            cart_id = %cart.id,
            identity = %identity,
            product_id = %product_id,
            total_cents = cart.total_price.amount_cents,
            "removed line"
        );
        audit("REMOVE_FROM_CART", identity, &cart, product_id.as_str());
        self.emitter
            .emit(CartEvent::new(CartEventKind::LineRemoved, &cart, Some(product_id)));

        Ok(CartOutcome {
            cart,
            created: false,
            cookie: CookieDirective::Keep,
        })
    }

    /// Remove every line and zero the totals. The record is kept.
    ///
    /// Anonymous callers are told to drop their cookie.
    pub async fn empty_cart(&self, identity: &CartIdentity) -> Result<CartOutcome, CommerceError> {
        let (_guards, mut cart) = self.existing_cart(identity).await?;
        cart.clear();
        self.carts.save(&cart).await?;
        self.invalidate(identity, &cart).await;

        tracing::info!(cart_id = %cart.id, identity = %identity, "emptied cart");
        audit("EMPTY_CART", identity, &cart, "");
        self.emitter
            .emit(CartEvent::new(CartEventKind::Emptied, &cart, None));

        let cookie = if identity.is_anonymous() {
            CookieDirective::Clear
        } else {
            CookieDirective::Keep
        };
        Ok(CartOutcome {
            cart,
            created: false,
            cookie,
        })
    }

    /// Read the cart for an identity.
    ///
    /// Never fails with "not found": an identity without a cart gets an
    /// empty, unsaved placeholder. Each lookup step reads through its own
    /// cache entry, so an entry is only ever filled with the cart that step
    /// resolves to.
    pub async fn get_cart(&self, identity: &CartIdentity) -> Result<Cart, CommerceError> {
        let _guards = self.locks.acquire_all(&identity.keys().into_iter().collect()).await;

        if let Some(user_id) = &identity.user_id {
            let key = cache_key!("cart", "user", user_id);
            if let Some(cart) = self.read_through(&key, self.carts.find_by_user(user_id)).await? {
                return Ok(cart);
            }
        }
        if let Some(cookie_id) = &identity.cookie_id {
            let key = cache_key!("cart", "cookie", cookie_id);
            if let Some(cart) = self.read_through(&key, self.carts.find_by_cookie(cookie_id)).await? {
                return Ok(cart);
            }
        }
        Ok(Cart::new(identity))
    }

    /// Grand total of an authenticated user's cart.
    pub async fn total_price(&self, user_id: &UserId) -> Result<Money, CommerceError> {
        self.carts
            .find_by_user(user_id)
            .await?
            .map(|cart| cart.total_price)
            .ok_or_else(|| CommerceError::CartNotFound(format!("user:{user_id}")))
    }

    /// Find a cart by user first, then by token.
    async fn locate(&self, identity: &CartIdentity) -> Result<Option<Located>, CommerceError> {
        if let Some(user_id) = &identity.user_id {
            if let Some(cart) = self.carts.find_by_user(user_id).await? {
                let cache_key = cache_key!("cart", "user", user_id);
                return Ok(Some(Located { cart, cache_key }));
            }
        }
        if let Some(cookie_id) = &identity.cookie_id {
            if let Some(cart) = self.carts.find_by_cookie(cookie_id).await? {
                let cache_key = cache_key!("cart", "cookie", cookie_id);
                return Ok(Some(Located { cart, cache_key }));
            }
        }
        Ok(None)
    }

    /// Lock the caller's keys, resolve the cart, and make sure the keys of
    /// the resolved cart are held too.
    ///
    /// A cart can be reached through a key the caller does not carry (a
    /// logged-in caller falling back to its token's cart, say). When that
    /// happens every guard is released and the union is taken again in
    /// sorted order.
    async fn lock_cart(
        &self,
        identity: &CartIdentity,
    ) -> Result<(KeyGuards, Option<Located>), CommerceError> {
        let mut keys: BTreeSet<String> = identity.keys().into_iter().collect();
        loop {
            let guards = self.locks.acquire_all(&keys).await;
            let located = self.locate(identity).await?;
            let Some(found) = &located else {
                return Ok((guards, None));
            };

            let held = keys.len();
            keys.extend(found.cart.identity().keys());
            if keys.len() == held {
                return Ok((guards, located));
            }
            drop(guards);
            tracing::debug!(
                cart_id = %found.cart.id,
                identity = %identity,
                "cart reached through another key, relocking"
            );
        }
    }

    async fn existing_cart(
        &self,
        identity: &CartIdentity,
    ) -> Result<(KeyGuards, Cart), CommerceError> {
        if identity.is_empty() {
            return Err(CommerceError::CartNotFound("no cart identity".to_string()));
        }
        match self.lock_cart(identity).await? {
            (guards, Some(located)) => Ok((guards, located.cart)),
            (_, None) => Err(CommerceError::CartNotFound(identity.to_string())),
        }
    }

    async fn product(&self, product_id: &ProductId) -> Result<Product, CommerceError> {
        self.catalog
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))
    }

    async fn read_through<F>(&self, key: &str, load: F) -> Result<Option<Cart>, CommerceError>
    where
        F: Future<Output = Result<Option<Cart>, CommerceError>>,
    {
        match self.cache.get::<Cart>(key).await {
            Ok(Some(cart)) => {
                tracing::debug!(key = %key, "cart cache hit");
                return Ok(Some(cart));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "cart cache read failed"),
        }

        let cart = load.await?;
        if let Some(cart) = &cart {
            self.fill_cache(key, cart).await;
        }
        Ok(cart)
    }

    async fn fill_cache(&self, key: &str, cart: &Cart) {
        if let Err(e) = self.cache.set(key, cart).await {
            tracing::warn!(key = %key, error = %e, "cart cache write failed");
        }
    }

    /// Drop the caller's entries and every entry of the cart's own identity.
    async fn invalidate(&self, identity: &CartIdentity, cart: &Cart) {
        let keys: BTreeSet<String> = identity
            .cache_keys()
            .into_iter()
            .chain(cart.identity().cache_keys())
            .collect();
        for key in keys {
            if let Err(e) = self.cache.delete(&key).await {
                tracing::warn!(key = %key, error = %e, "cart cache invalidation failed");
            }
        }
    }
}

fn validate_product_id(product_id: &ProductId) -> Result<(), CommerceError> {
    if product_id.is_blank() {
        return Err(CommerceError::ValidationError(
            "product id is required".to_string(),
        ));
    }
    Ok(())
}

fn audit(action: &'static str, identity: &CartIdentity, cart: &Cart, name: &str) {
    tracing::info!(
        target: "audit",
        action,
        identity = %identity,
        cart_id = %cart.id,
        name,
        "cart action"
    );
}
