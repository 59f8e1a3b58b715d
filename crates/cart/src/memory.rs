//! In-memory [`CartBackend`] for tests.
//!
//! Behaves like the marketplace cart API: adding an existing product bumps
//! its quantity, decreasing stops at one, removing an absent product is
//! accepted. Every call is recorded, and the backend can be told to fail or
//! to stall individual calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agriverse_core::{LineItem, ProductId, QuantityAction, UserId};
use async_trait::async_trait;

use crate::backend::CartBackend;
use crate::error::{CartError, Result};

/// A call received by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Load(UserId),
    Add {
        user_id: UserId,
        product_id: ProductId,
    },
    Remove {
        user_id: UserId,
        product_id: ProductId,
    },
    Update {
        user_id: UserId,
        product_id: ProductId,
        action: QuantityAction,
    },
    Clear(UserId),
}

#[derive(Debug, Default)]
struct MemoryState {
    carts: HashMap<UserId, Vec<LineItem>>,
    calls: Vec<RecordedCall>,
    failing: bool,
    delays: VecDeque<Duration>,
}

/// Shared in-memory cart backend. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored cart for `user_id`.
    pub fn set_cart(&self, user_id: &UserId, items: Vec<LineItem>) {
        self.lock().carts.insert(user_id.clone(), items);
    }

    /// Stored cart for `user_id`.
    #[must_use]
    pub fn cart(&self, user_id: &UserId) -> Vec<LineItem> {
        self.lock().carts.get(user_id).cloned().unwrap_or_default()
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Delay an upcoming call. Queued delays are used one per call, in order.
    pub fn push_delay(&self, delay: Duration) {
        self.lock().delays.push_back(delay);
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Take the next delay, then record `call` and apply `mutate` unless
    /// the backend is failing.
    async fn handle<T>(
        &self,
        call: RecordedCall,
        mutate: impl FnOnce(&mut MemoryState) -> T + Send,
    ) -> Result<T> {
        let delay = self.lock().delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.calls.push(call);
        if state.failing {
            return Err(CartError::Unavailable("memory backend set to fail".to_string()));
        }
        Ok(mutate(&mut state))
    }
}

#[async_trait]
impl CartBackend for MemoryBackend {
    async fn load_cart(&self, user_id: &UserId) -> Result<Vec<LineItem>> {
        self.handle(RecordedCall::Load(user_id.clone()), |state| {
            state.carts.get(user_id).cloned().unwrap_or_default()
        })
        .await
    }

    async fn add_item(&self, user_id: &UserId, item: &LineItem) -> Result<()> {
        let call = RecordedCall::Add {
            user_id: user_id.clone(),
            product_id: item.product_id.clone(),
        };
        self.handle(call, |state| {
            let cart = state.carts.entry(user_id.clone()).or_default();
            match cart.iter_mut().find(|line| line.product_id == item.product_id) {
                Some(line) => line.quantity = line.quantity.increment(),
                None => cart.push(item.clone()),
            }
        })
        .await
    }

    async fn remove_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<()> {
        let call = RecordedCall::Remove {
            user_id: user_id.clone(),
            product_id: product_id.clone(),
        };
        self.handle(call, |state| {
            if let Some(cart) = state.carts.get_mut(user_id) {
                cart.retain(|line| &line.product_id != product_id);
            }
        })
        .await
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        action: QuantityAction,
    ) -> Result<()> {
        let call = RecordedCall::Update {
            user_id: user_id.clone(),
            product_id: product_id.clone(),
            action,
        };
        self.handle(call, |state| {
            let line = state
                .carts
                .get_mut(user_id)
                .and_then(|cart| cart.iter_mut().find(|line| &line.product_id == product_id));
            if let Some(line) = line {
                line.quantity = match action {
                    QuantityAction::Increase => line.quantity.increment(),
                    QuantityAction::Decrease => line.quantity.decrement().unwrap_or(line.quantity),
                };
            }
        })
        .await
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<()> {
        self.handle(RecordedCall::Clear(user_id.clone()), |state| {
            state.carts.remove(user_id);
        })
        .await
    }
}
