//! Cart ownership keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use shop_cache::{cache_key, SessionId};

use crate::ids::UserId;

/// The key a cart is looked up by.
///
/// Resolved upstream from the request: an authenticated user id, an
/// anonymous session token, or both once a user logs in with a token.
/// Lookups try the user first and fall back to the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartIdentity {
    /// Authenticated user.
    pub user_id: Option<UserId>,
    /// Anonymous session token.
    pub cookie_id: Option<SessionId>,
}

impl CartIdentity {
    /// Identity carrying only an anonymous token.
    pub fn anonymous(cookie_id: SessionId) -> Self {
        Self {
            user_id: None,
            cookie_id: Some(cookie_id),
        }
    }

    /// Identity carrying only a user id.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            cookie_id: None,
        }
    }

    /// Attach an anonymous token.
    pub fn with_cookie(mut self, cookie_id: SessionId) -> Self {
        self.cookie_id = Some(cookie_id);
        self
    }

    /// Check if neither key is present.
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.cookie_id.is_none()
    }

    /// Check if no authenticated user is attached.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// Identity keys, user first: `user:<id>` and `cookie:<token>`.
    ///
    /// Lock slots and notification connections are addressed by these.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(user) = &self.user_id {
            keys.push(cache_key!("user", user));
        }
        if let Some(cookie) = &self.cookie_id {
            keys.push(cache_key!("cookie", cookie));
        }
        keys
    }

    /// Every cache key under which a cart for this identity may be stored.
    pub fn cache_keys(&self) -> Vec<String> {
        self.keys()
            .into_iter()
            .map(|key| cache_key!("cart", key))
            .collect()
    }
}

impl fmt::Display for CartIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.user_id, &self.cookie_id) {
            (Some(user), Some(cookie)) => write!(f, "user:{user}+cookie:{cookie}"),
            (Some(user), None) => write!(f, "user:{user}"),
            (None, Some(cookie)) => write!(f, "cookie:{cookie}"),
            (None, None) => write!(f, "none"),
        }
    }
}
