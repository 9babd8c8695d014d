//! Connection registry for cart change notifications.
//!
//! Maps an identity key (`user:<id>` or `cookie:<token>`) to the handle of the
//! one live connection for that identity. Handles are in-process channels; a
//! transport task owns the receiving end.
//!
//! The HTTP router exposes no transport of its own. The registry is the hook
//! for an embedding service: take [`AppState::connections`], call
//! [`ConnectionRegistry::register`] with the key a client authenticated as,
//! and forward the returned [`ConnectionStream`] over whatever socket that
//! service speaks. Until something registers, events are counted as
//! undelivered and dropped.
//!
//! [`AppState::connections`]: crate::state::AppState::connections

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use shop_commerce::events::{CartEvent, NotificationEmitter};
use tokio::sync::mpsc;

/// Sending half of a registered connection.
pub type ConnectionHandle = mpsc::UnboundedSender<CartEvent>;

/// Receiving half handed to the connection owner.
pub type ConnectionStream = mpsc::UnboundedReceiver<CartEvent>;

/// Registry of live connections, one per identity key.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `key`, replacing any previous one.
    pub fn register(&self, key: impl Into<String>) -> ConnectionStream {
        let key = key.into();
        let (tx, rx) = mpsc::unbounded_channel();
        if self.write().insert(key.clone(), tx).is_some() {
            tracing::debug!(key = %key, "replaced existing connection");
        }
        tracing::debug!(key = %key, "connection registered");
        rx
    }

    /// Drop the connection for `key`.
    pub fn unregister(&self, key: &str) -> bool {
        let removed = self.write().remove(key).is_some();
        if removed {
            tracing::debug!(key = %key, "connection unregistered");
        }
        removed
    }

    /// The handle registered for `key`.
    pub fn lookup(&self, key: &str) -> Option<ConnectionHandle> {
        self.read().get(key).cloned()
    }

    /// Deliver an event to one connection.
    ///
    /// A connection whose receiver is gone is removed and reported as not
    /// delivered.
    pub fn send_to(&self, key: &str, event: CartEvent) -> bool {
        let Some(handle) = self.lookup(key) else {
            return false;
        };
        if handle.send(event).is_ok() {
            return true;
        }
        self.unregister(key);
        false
    }

    /// Deliver an event to every connection. Returns the number reached.
    pub fn broadcast(&self, event: &CartEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (key, handle) in self.read().iter() {
            if handle.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(key.clone());
            }
        }
        if !closed.is_empty() {
            let mut connections = self.write();
            for key in closed {
                connections.remove(&key);
            }
        }
        delivered
    }

    /// Number of registered connections.
    pub fn connected(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ConnectionHandle>> {
        match self.connections.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ConnectionHandle>> {
        match self.connections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl NotificationEmitter for ConnectionRegistry {
    fn emit(&self, event: CartEvent) {
        let mut delivered = 0;
        for key in event.identity.keys() {
            if self.send_to(&key, event.clone()) {
                delivered += 1;
            }
        }
        tracing::debug!(cart_id = %event.cart_id, kind = ?event.kind, delivered, "cart event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_cache::SessionId;
    use shop_commerce::cart::{Cart, CartIdentity};
    use shop_commerce::events::CartEventKind;
    use shop_commerce::UserId;

    fn event_for(identity: &CartIdentity) -> CartEvent {
        CartEvent::new(CartEventKind::Updated, &Cart::new(identity), None)
    }

    #[test]
    fn test_register_lookup_unregister() {
        let registry = ConnectionRegistry::new();
        let _rx = registry.register("cookie:c1");
        assert_eq!(registry.connected(), 1);
        assert!(registry.lookup("cookie:c1").is_some());
        assert!(registry.lookup("cookie:c2").is_none());

        assert!(registry.unregister("cookie:c1"));
        assert!(!registry.unregister("cookie:c1"));
        assert_eq!(registry.connected(), 0);
    }

    #[test]
    fn test_emit_reaches_owner_only() {
        let registry = ConnectionRegistry::new();
        let mut owner = registry.register("cookie:c1");
        let mut other = registry.register("cookie:c2");

        let identity = CartIdentity::anonymous(SessionId::new("c1"));
        registry.emit(event_for(&identity));

        assert_eq!(owner.try_recv().unwrap().identity, identity);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_emit_reaches_user_and_cookie() {
        let registry = ConnectionRegistry::new();
        let mut by_user = registry.register("user:u1");
        let mut by_cookie = registry.register("cookie:c1");

        let identity = CartIdentity::user(UserId::new("u1")).with_cookie(SessionId::new("c1"));
        registry.emit(event_for(&identity));

        assert!(by_user.try_recv().is_ok());
        assert!(by_cookie.try_recv().is_ok());
    }

    #[test]
    fn test_closed_connections_are_dropped() {
        let registry = ConnectionRegistry::new();
        drop(registry.register("cookie:c1"));
        let _live = registry.register("cookie:c2");

        let event = event_for(&CartIdentity::anonymous(SessionId::new("c1")));
        assert!(!registry.send_to("cookie:c1", event.clone()));
        assert_eq!(registry.connected(), 1);

        drop(registry.register("cookie:c3"));
        assert_eq!(registry.broadcast(&event), 1);
        assert_eq!(registry.connected(), 1);
    }

    #[test]
    fn test_register_replaces_previous() {
        let registry = ConnectionRegistry::new();
        let mut first = registry.register("cookie:c1");
        let mut second = registry.register("cookie:c1");

        let event = event_for(&CartIdentity::anonymous(SessionId::new("c1")));
        assert!(registry.send_to("cookie:c1", event));
        assert!(second.try_recv().is_ok());
        // The replaced sender was dropped, so the old stream is closed.
        assert!(matches!(
            first.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
