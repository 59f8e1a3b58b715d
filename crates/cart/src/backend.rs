//! Remote cart store abstraction.
//!
//! [`CartBackend`] is the seam between the [`crate::CartStore`] and whatever
//! holds the authoritative cart. [`crate::HttpCartClient`] talks to the
//! marketplace API; the `test-util` feature adds an in-memory implementation.

use agriverse_core::{LineItem, ProductId, QuantityAction, UserId};
use async_trait::async_trait;

use crate::error::Result;

/// Operations the cart store needs from the remote cart.
///
/// Implementations are cheap to clone; one clone is moved into every sync
/// lane.
#[async_trait]
pub trait CartBackend: Clone + Send + Sync + 'static {
    /// Fetch the cart for `user_id`.
    ///
    /// A response that is valid JSON but not an array is an empty cart, not
    /// an error.
    async fn load_cart(&self, user_id: &UserId) -> Result<Vec<LineItem>>;

    /// Record a newly added line.
    async fn add_item(&self, user_id: &UserId, item: &LineItem) -> Result<()>;

    /// Drop the line for `product_id`.
    async fn remove_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<()>;

    /// Step the quantity of `product_id` by one in the given direction.
    async fn update_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        action: QuantityAction,
    ) -> Result<()>;

    /// Empty the whole cart.
    async fn clear_cart(&self, user_id: &UserId) -> Result<()>;
}
