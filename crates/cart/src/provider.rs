//! Cart context shared by presentation surfaces.
//!
//! A [`CartProvider`] owns at most one [`CartStore`] at a time. Surfaces
//! reach the cart through [`CartProvider::cart`] / [`CartProvider::cart_mut`],
//! which fail with [`CartError::NoProvider`] until a store has been mounted.
//! Identity changes (login, logout) go through
//! [`CartProvider::switch_identity`], which throws away the old cart and
//! loads the new one.

use agriverse_core::UserId;
use tracing::info;

use crate::backend::CartBackend;
use crate::error::{CartError, Result};
use crate::store::{CartStore, RollbackPolicy};

/// Owner of the current identity's cart store.
#[derive(Debug)]
pub struct CartProvider<B: CartBackend> {
    backend: B,
    policy: RollbackPolicy,
    store: Option<CartStore<B>>,
}

impl<B: CartBackend> CartProvider<B> {
    /// Create an unmounted provider.
    #[must_use]
    pub const fn new(backend: B, policy: RollbackPolicy) -> Self {
        Self {
            backend,
            policy,
            store: None,
        }
    }

    /// Create the store for `identity` and load its cart, replacing any
    /// store already mounted.
    pub async fn mount(&mut self, identity: Option<UserId>) -> &mut CartStore<B> {
        info!(user_id = ?identity, "Mounting cart");
        let store = CartStore::open(self.backend.clone(), identity, self.policy).await;
        self.store.insert(store)
    }

    /// React to a login or logout.
    ///
    /// Does nothing if `identity` matches the mounted store. Otherwise drops
    /// the current store (its in-flight requests still run, their results
    /// are discarded) and mounts one for `identity`. Returns whether a new
    /// store was mounted.
    pub async fn switch_identity(&mut self, identity: Option<UserId>) -> bool {
        if let Some(store) = &self.store
            && store.user_id() == identity.as_ref()
        {
            return false;
        }

        self.mount(identity).await;
        true
    }

    /// Drop the store (session ended).
    pub fn unmount(&mut self) -> Option<CartStore<B>> {
        self.store.take()
    }

    /// Whether a store is mounted.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.store.is_some()
    }

    /// The mounted store.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoProvider`] if nothing is mounted.
    pub fn cart(&self) -> Result<&CartStore<B>> {
        self.store.as_ref().ok_or(CartError::NoProvider)
    }

    /// The mounted store, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoProvider`] if nothing is mounted.
    pub fn cart_mut(&mut self) -> Result<&mut CartStore<B>> {
        self.store.as_mut().ok_or(CartError::NoProvider)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agriverse_core::{LineItem, Price, Product, ProductId, Quantity};

    use super::*;
    use crate::memory::{MemoryBackend, RecordedCall};

    fn line(id: &str) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: id.to_string(),
            price: Price::from_units(20),
            image: String::new(),
            quantity: Quantity::ONE,
        }
    }

    #[tokio::test]
    async fn test_unmounted_provider_is_usage_error() {
        let mut provider = CartProvider::new(MemoryBackend::new(), RollbackPolicy::Keep);

        assert!(!provider.is_mounted());
        assert!(matches!(provider.cart(), Err(CartError::NoProvider)));
        assert!(matches!(provider.cart_mut(), Err(CartError::NoProvider)));
    }

    #[tokio::test]
    async fn test_switch_identity_reloads_for_new_user() {
        let backend = MemoryBackend::new();
        backend.set_cart(&UserId::new("u1"), vec![line("p1")]);
        backend.set_cart(&UserId::new("u2"), vec![line("p2"), line("p3")]);
        let mut provider = CartProvider::new(backend.clone(), RollbackPolicy::Keep);

        provider.mount(Some(UserId::new("u1"))).await;
        assert_eq!(provider.cart().unwrap().len(), 1);

        assert!(provider.switch_identity(Some(UserId::new("u2"))).await);
        let cart = provider.cart().unwrap();
        assert_eq!(cart.user_id(), Some(&UserId::new("u2")));
        assert_eq!(cart.len(), 2);
        assert!(!cart.contains(&ProductId::new("p1")));
    }

    #[tokio::test]
    async fn test_switch_to_same_identity_is_noop() {
        let backend = MemoryBackend::new();
        let mut provider = CartProvider::new(backend.clone(), RollbackPolicy::Keep);
        provider.mount(Some(UserId::new("u1"))).await;

        assert!(!provider.switch_identity(Some(UserId::new("u1"))).await);
        assert_eq!(backend.calls(), vec![RecordedCall::Load(UserId::new("u1"))]);
    }

    #[tokio::test]
    async fn test_logout_empties_cart_without_calls() {
        let backend = MemoryBackend::new();
        backend.set_cart(&UserId::new("u1"), vec![line("p1")]);
        let mut provider = CartProvider::new(backend.clone(), RollbackPolicy::Keep);
        provider.mount(Some(UserId::new("u1"))).await;

        assert!(provider.switch_identity(None).await);

        let cart = provider.cart_mut().unwrap();
        assert!(cart.is_empty());
        let ticket = cart.add_to_cart(&Product {
            id: ProductId::new("p4"),
            name: "Millet".to_string(),
            price: Price::from_units(40),
            image: String::new(),
            category: None,
        });
        assert!(ticket.is_skipped());
        assert!(cart.is_empty());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unmount_drops_store() {
        let mut provider = CartProvider::new(MemoryBackend::new(), RollbackPolicy::Keep);
        provider.mount(None).await;
        assert!(provider.is_mounted());

        assert!(provider.unmount().is_some());
        assert!(matches!(provider.cart(), Err(CartError::NoProvider)));
    }
}
