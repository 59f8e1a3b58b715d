//! The cart store.
//!
//! [`CartStore`] owns the ordered list of line items for one identity and
//! keeps the backend in step with it. Every mutation is applied locally
//! first and is visible as soon as the call returns; the matching remote
//! call is queued on the product's sync lane and reported back through a
//! [`SyncTicket`] and the store's pending counters.
//!
//! A store without an identity is always empty: mutations do nothing and no
//! request is ever made.

use std::collections::HashMap;
use std::str::FromStr;

use agriverse_core::{LineItem, Price, Product, ProductId, Quantity, QuantityAction, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::CartBackend;
use crate::sync::{Completion, RemoteOp, SyncOutcome, SyncQueue, SyncTicket};

/// What to do with local state when the backend rejects a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Leave the optimistic change in place and record the failure.
    #[default]
    Keep,
    /// Undo the local change as well as recording the failure.
    Revert,
}

impl FromStr for RollbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "revert" => Ok(Self::Revert),
            other => Err(format!("expected 'keep' or 'revert', got '{other}'")),
        }
    }
}

/// The most recent remote failure seen by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// Correlation id of the failed request.
    pub request_id: Uuid,
    /// `load`, `add`, `remove`, `increase`, `decrease` or `clear`.
    pub operation: &'static str,
    /// Product involved, if any.
    pub product_id: Option<ProductId>,
    /// Error text.
    pub reason: String,
}

/// Ordered, identity-scoped cart with optimistic remote sync.
pub struct CartStore<B: CartBackend> {
    backend: B,
    user_id: Option<UserId>,
    items: Vec<LineItem>,
    policy: RollbackPolicy,
    /// In-flight remote calls per product.
    pending: HashMap<ProductId, usize>,
    /// In-flight whole-cart calls.
    pending_cart: usize,
    last_sync_error: Option<SyncFailure>,
    queue: Option<SyncQueue<B>>,
    completions: mpsc::UnboundedReceiver<Completion>,
}

impl<B: CartBackend> std::fmt::Debug for CartStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("user_id", &self.user_id)
            .field("items", &self.items)
            .field("policy", &self.policy)
            .field("pending", &self.pending)
            .field("pending_cart", &self.pending_cart)
            .field("last_sync_error", &self.last_sync_error)
            .finish_non_exhaustive()
    }
}

impl<B: CartBackend> CartStore<B> {
    /// Create a store for `user_id` and load its cart.
    ///
    /// With no identity the store is empty and no request is made. A failed
    /// or malformed load leaves the cart empty; see [`Self::last_sync_error`].
    pub async fn open(backend: B, user_id: Option<UserId>, policy: RollbackPolicy) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let queue = user_id
            .clone()
            .map(|id| SyncQueue::new(backend.clone(), id, completions_tx));

        let mut store = Self {
            backend,
            user_id,
            items: Vec::new(),
            policy,
            pending: HashMap::new(),
            pending_cart: 0,
            last_sync_error: None,
            queue,
            completions,
        };
        store.reload().await;
        store
    }

    /// Replace local items with the backend's copy of the cart.
    ///
    /// A successful load forgets an earlier load failure; failures of
    /// mutations stay recorded. Local changes whose remote calls are still
    /// in flight may be overwritten; call [`Self::settle`] first to avoid
    /// that.
    #[instrument(skip(self), fields(user_id = ?self.user_id))]
    pub async fn reload(&mut self) {
        let Some(user_id) = self.user_id.as_ref() else {
            self.items.clear();
            return;
        };

        match self.backend.load_cart(user_id).await {
            Ok(items) => {
                self.items = merge_duplicates(items);
                if self
                    .last_sync_error
                    .as_ref()
                    .is_some_and(|failure| failure.operation == "load")
                {
                    self.last_sync_error = None;
                }
                info!(lines = self.items.len(), "Cart loaded");
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart, starting empty");
                self.items.clear();
                self.last_sync_error = Some(SyncFailure {
                    request_id: Uuid::new_v4(),
                    operation: "load",
                    product_id: None,
                    reason: e.to_string(),
                });
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Put one unit of `product` in the cart.
    ///
    /// A product already in the cart has its quantity increased instead; a
    /// new product is appended with quantity 1 and sent to the backend.
    pub fn add_to_cart(&mut self, product: &Product) -> SyncTicket {
        if self.user_id.is_none() {
            return SyncTicket::skipped();
        }
        if self.contains(&product.id) {
            return self.increase_qty(&product.id);
        }

        let item = LineItem::from_product(product);
        debug!(product_id = %item.product_id, "Adding to cart");
        self.items.push(item.clone());
        self.submit(RemoteOp::Add(item))
    }

    /// Drop the line for `product_id`. Absent products are a no-op.
    ///
    /// The line disappears locally right away; the backend delete is queued
    /// after it.
    pub fn remove_from_cart(&mut self, product_id: &ProductId) -> SyncTicket {
        if self.user_id.is_none() {
            return SyncTicket::skipped();
        }
        let Some(index) = self.position(product_id) else {
            return SyncTicket::skipped();
        };

        let removed = self.items.remove(index);
        debug!(product_id = %product_id, "Removing from cart");
        self.submit(RemoteOp::Remove(removed))
    }

    /// Add one unit to an existing line. Absent products are a no-op.
    pub fn increase_qty(&mut self, product_id: &ProductId) -> SyncTicket {
        if self.user_id.is_none() {
            return SyncTicket::skipped();
        }
        let Some(item) = self.item_mut(product_id) else {
            return SyncTicket::skipped();
        };

        item.quantity = item.quantity.increment();
        debug!(product_id = %product_id, quantity = %item.quantity, "Increasing quantity");
        self.submit(RemoteOp::Update {
            product_id: product_id.clone(),
            action: QuantityAction::Increase,
        })
    }

    /// Remove one unit from an existing line.
    ///
    /// A line at quantity 1 stays at 1 and nothing is sent; use
    /// [`Self::remove_from_cart`] to drop it.
    pub fn decrease_qty(&mut self, product_id: &ProductId) -> SyncTicket {
        if self.user_id.is_none() {
            return SyncTicket::skipped();
        }
        let Some(item) = self.item_mut(product_id) else {
            return SyncTicket::skipped();
        };
        let Some(lower) = item.quantity.decrement() else {
            return SyncTicket::skipped();
        };

        item.quantity = lower;
        debug!(product_id = %product_id, quantity = %lower, "Decreasing quantity");
        self.submit(RemoteOp::Update {
            product_id: product_id.clone(),
            action: QuantityAction::Decrease,
        })
    }

    /// Empty the cart, e.g. after checkout. An empty cart sends nothing.
    pub fn clear_cart(&mut self) -> SyncTicket {
        if self.user_id.is_none() || self.items.is_empty() {
            return SyncTicket::skipped();
        }

        let removed = std::mem::take(&mut self.items);
        debug!(lines = removed.len(), "Clearing cart");
        self.submit(RemoteOp::Clear(removed))
    }

    // =========================================================================
    // Sync bookkeeping
    // =========================================================================

    /// Apply every remote result that has arrived so far, without waiting.
    ///
    /// Returns the number of results applied.
    pub fn apply_sync_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait until no remote call is in flight, applying results as they
    /// arrive.
    pub async fn settle(&mut self) {
        while self.has_pending() {
            match self.completions.recv().await {
                Some(completion) => self.apply_completion(completion),
                None => break,
            }
        }
        self.apply_sync_results();
    }

    fn submit(&mut self, op: RemoteOp) -> SyncTicket {
        let Some(queue) = self.queue.as_mut() else {
            return SyncTicket::skipped();
        };

        match op.product_id() {
            Some(product_id) => *self.pending.entry(product_id.clone()).or_default() += 1,
            None => self.pending_cart += 1,
        }
        queue.submit(op)
    }

    fn apply_completion(&mut self, completion: Completion) {
        let Completion {
            request_id,
            op,
            outcome,
        } = completion;

        match op.product_id() {
            Some(product_id) => {
                if let Some(count) = self.pending.get_mut(product_id) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.pending.remove(product_id);
                    }
                }
            }
            None => self.pending_cart = self.pending_cart.saturating_sub(1),
        }

        if let SyncOutcome::Failed(reason) = outcome {
            self.last_sync_error = Some(SyncFailure {
                request_id,
                operation: op.kind(),
                product_id: op.product_id().cloned(),
                reason,
            });
            if self.policy == RollbackPolicy::Revert {
                self.revert(op);
            }
        }
    }

    /// Undo the local half of a failed mutation.
    fn revert(&mut self, op: RemoteOp) {
        debug!(op = op.kind(), "Reverting failed cart change");
        match op {
            RemoteOp::Add(item) => {
                if let Some(index) = self.position(&item.product_id) {
                    self.items.remove(index);
                }
            }
            RemoteOp::Remove(item) => {
                if !self.contains(&item.product_id) {
                    self.items.push(item);
                }
            }
            RemoteOp::Update { product_id, action } => {
                if let Some(item) = self.item_mut(&product_id) {
                    match action.inverse() {
                        QuantityAction::Increase => item.quantity = item.quantity.increment(),
                        QuantityAction::Decrease => {
                            if let Some(lower) = item.quantity.decrement() {
                                item.quantity = lower;
                            }
                        }
                    }
                }
            }
            RemoteOp::Clear(items) => {
                for item in items {
                    if !self.contains(&item.product_id) {
                        self.items.push(item);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Identity this store belongs to.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Line for `product_id`.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Whether `product_id` is in the cart.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.get(product_id).is_some()
    }

    /// Units of `product_id` in the cart (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.get(product_id).map_or(0, |item| item.quantity.get())
    }

    /// Total units across all lines (the cart badge number).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity.get()))
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Whether a remote call for `product_id` is still in flight.
    #[must_use]
    pub fn is_pending(&self, product_id: &ProductId) -> bool {
        self.pending.contains_key(product_id)
    }

    /// Whether any remote call is still in flight.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_cart > 0 || !self.pending.is_empty()
    }

    /// Rollback policy in force.
    #[must_use]
    pub const fn policy(&self) -> RollbackPolicy {
        self.policy
    }

    /// Most recent remote failure, if any.
    #[must_use]
    pub const fn last_sync_error(&self) -> Option<&SyncFailure> {
        self.last_sync_error.as_ref()
    }

    /// Forget the recorded failure.
    pub fn clear_sync_error(&mut self) -> Option<SyncFailure> {
        self.last_sync_error.take()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| &item.product_id == product_id)
    }

    fn item_mut(&mut self, product_id: &ProductId) -> Option<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
    }
}

/// Fold repeated product ids into their first line, summing quantities.
fn merge_duplicates(items: Vec<LineItem>) -> Vec<LineItem> {
    let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            Some(existing) => {
                warn!(product_id = %item.product_id, "Backend cart has duplicate lines, merging");
                let total = existing.quantity.get().saturating_add(item.quantity.get());
                if let Ok(quantity) = Quantity::new(total) {
                    existing.quantity = quantity;
                }
            }
            None => merged.push(item),
        }
    }
    merged
}
