//! Ordered delivery of cart mutations to the backend.
//!
//! Every remote call goes through a [`SyncQueue`]. The queue keeps one lane
//! per product (plus one lane for whole-cart operations); each lane is a
//! tokio task that runs its commands strictly in submission order, so the
//! backend sees the mutations for a product in the order the user made
//! them. Lanes for different products run concurrently.
//!
//! Each submitted command reports its result twice: once on the
//! [`SyncTicket`] returned to the caller, and once on the completion channel
//! the owning [`crate::CartStore`] drains to update its pending counters.
//!
//! A whole-cart call (clear) is a barrier: it waits for every product lane
//! to drain what was queued before it, and product commands queued after it
//! wait for it to finish.
//!
//! Lanes are spawned on first use and end once the queue is dropped and
//! their backlog is done.

use std::collections::HashMap;

use agriverse_core::{LineItem, ProductId, QuantityAction, UserId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::backend::CartBackend;
use crate::error::{CartError, Result};

/// A mutation to replay against the backend.
///
/// Variants carry a snapshot of what changed locally so a failed call can
/// be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    /// A new line was appended.
    Add(LineItem),
    /// A line was dropped; holds the removed line.
    Remove(LineItem),
    /// A quantity was stepped.
    Update {
        product_id: ProductId,
        action: QuantityAction,
    },
    /// The whole cart was emptied; holds the removed lines.
    Clear(Vec<LineItem>),
}

impl RemoteOp {
    /// Product this operation is about, `None` for whole-cart operations.
    #[must_use]
    pub const fn product_id(&self) -> Option<&ProductId> {
        match self {
            Self::Add(item) | Self::Remove(item) => Some(&item.product_id),
            Self::Update { product_id, .. } => Some(product_id),
            Self::Clear(_) => None,
        }
    }

    /// Short name for logs and failure reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::Update {
                action: QuantityAction::Increase,
                ..
            } => "increase",
            Self::Update {
                action: QuantityAction::Decrease,
                ..
            } => "decrease",
            Self::Clear(_) => "clear",
        }
    }

    fn lane(&self) -> Lane {
        self.product_id()
            .map_or(Lane::Cart, |id| Lane::Product(id.clone()))
    }

    async fn execute<B: CartBackend>(&self, backend: &B, user_id: &UserId) -> Result<()> {
        match self {
            Self::Add(item) => backend.add_item(user_id, item).await,
            Self::Remove(item) => backend.remove_item(user_id, &item.product_id).await,
            Self::Update { product_id, action } => {
                backend.update_quantity(user_id, product_id, *action).await
            }
            Self::Clear(_) => backend.clear_cart(user_id).await,
        }
    }
}

/// Final state of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Backend accepted the change.
    Confirmed,
    /// Backend call failed; local and remote state may differ.
    Failed(String),
    /// Nothing was sent (no identity, or the mutation was a no-op).
    Skipped,
}

impl SyncOutcome {
    /// Whether the call failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Handle on the remote half of a cart mutation.
///
/// Dropping the ticket is fine; the call still runs and the store still
/// records its result.
#[derive(Debug)]
pub struct SyncTicket {
    request_id: Option<Uuid>,
    receiver: Option<oneshot::Receiver<SyncOutcome>>,
}

impl SyncTicket {
    /// Ticket for a mutation that sent nothing.
    #[must_use]
    pub const fn skipped() -> Self {
        Self {
            request_id: None,
            receiver: None,
        }
    }

    /// Correlation id of the remote call (also on its log span).
    #[must_use]
    pub const fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }

    /// Whether a remote call was issued.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.receiver.is_none()
    }

    /// Wait for the remote call to finish.
    pub async fn outcome(self) -> SyncOutcome {
        match self.receiver {
            None => SyncOutcome::Skipped,
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| SyncOutcome::Failed(CartError::SyncStopped.to_string())),
        }
    }
}

/// Result of one remote call, delivered to the owning store.
#[derive(Debug, Clone)]
pub(crate) struct Completion {
    pub request_id: Uuid,
    pub op: RemoteOp,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Lane {
    Product(ProductId),
    Cart,
}

/// Resolves to `true` once a whole-cart call has finished.
type Barrier = watch::Receiver<bool>;

/// Held by a whole-cart call: it waits for every product lane to reach its
/// fence, runs, then opens the barrier.
struct Gate {
    reached: Vec<oneshot::Receiver<()>>,
    done: watch::Sender<bool>,
}

enum Command {
    Run {
        request_id: Uuid,
        op: RemoteOp,
        reply: oneshot::Sender<SyncOutcome>,
        gate: Option<Gate>,
    },
    /// Park the lane until `release` opens; signal `reached` on arrival.
    Fence {
        reached: oneshot::Sender<()>,
        release: Barrier,
    },
}

/// Per-product ordered dispatcher for one user's cart.
///
/// Whole-cart calls act as a barrier across lanes: a clear runs after every
/// product command queued before it, and product commands queued after it
/// wait until it has finished.
pub(crate) struct SyncQueue<B: CartBackend> {
    backend: B,
    user_id: UserId,
    lanes: HashMap<Lane, mpsc::UnboundedSender<Command>>,
    completions: mpsc::UnboundedSender<Completion>,
    /// Barrier of the most recent whole-cart call; new lanes start behind it.
    barrier: Option<Barrier>,
}

impl<B: CartBackend> SyncQueue<B> {
    pub fn new(backend: B, user_id: UserId, completions: mpsc::UnboundedSender<Completion>) -> Self {
        Self {
            backend,
            user_id,
            lanes: HashMap::new(),
            completions,
            barrier: None,
        }
    }

    /// Queue `op` behind any earlier commands for the same product, and
    /// behind any earlier whole-cart call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, op: RemoteOp) -> SyncTicket {
        let request_id = Uuid::new_v4();
        let (reply, receiver) = oneshot::channel();
        let lane = op.lane();

        debug!(%request_id, op = op.kind(), "Queueing cart sync");

        let gate = (lane == Lane::Cart).then(|| self.fence_product_lanes());
        self.dispatch(
            &lane,
            Command::Run {
                request_id,
                op,
                reply,
                gate,
            },
        );

        SyncTicket {
            request_id: Some(request_id),
            receiver: Some(receiver),
        }
    }

    /// Park every product lane at its current tail until the whole-cart
    /// call about to be queued has finished.
    fn fence_product_lanes(&mut self) -> Gate {
        let (done, release) = watch::channel(false);
        let mut reached = Vec::new();

        for (lane, sender) in &self.lanes {
            if *lane == Lane::Cart {
                continue;
            }
            let (reached_tx, reached_rx) = oneshot::channel();
            // A dead lane drops `reached_tx`, which also resolves the wait
            let _ = sender.send(Command::Fence {
                reached: reached_tx,
                release: release.clone(),
            });
            reached.push(reached_rx);
        }

        self.barrier = Some(release);
        Gate { reached, done }
    }

    fn dispatch(&mut self, lane: &Lane, mut command: Command) {
        if let Some(sender) = self.lanes.get(lane) {
            match sender.send(command) {
                Ok(()) => return,
                // Lane task is gone (it panicked); start a fresh one
                Err(mpsc::error::SendError(returned)) => command = returned,
            }
        }

        let sender = self.spawn_lane(lane);
        if let Err(mpsc::error::SendError(Command::Run { reply, .. })) = sender.send(command) {
            // A lane we just spawned cannot have closed its receiver yet
            let _ = reply.send(SyncOutcome::Failed(CartError::SyncStopped.to_string()));
        }
        self.lanes.insert(lane.clone(), sender);
    }

    fn spawn_lane(&self, lane: &Lane) -> mpsc::UnboundedSender<Command> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Command>();
        let backend = self.backend.clone();
        let user_id = self.user_id.clone();
        let completions = self.completions.clone();
        // The cart lane is ordered against product lanes by its gates instead
        let start_after = match lane {
            Lane::Product(_) => self.barrier.clone(),
            Lane::Cart => None,
        };
        let span = match lane {
            Lane::Product(product_id) => {
                info_span!("cart_sync_lane", user_id = %user_id, product_id = %product_id)
            }
            Lane::Cart => info_span!("cart_sync_lane", user_id = %user_id, product_id = "*"),
        };

        tokio::spawn(
            async move {
                if let Some(mut barrier) = start_after {
                    let _ = barrier.wait_for(|done| *done).await;
                }

                while let Some(command) = receiver.recv().await {
                    match command {
                        Command::Fence {
                            reached,
                            mut release,
                        } => {
                            let _ = reached.send(());
                            // A closed barrier means the whole-cart call is gone; carry on
                            let _ = release.wait_for(|done| *done).await;
                        }
                        Command::Run {
                            request_id,
                            op,
                            reply,
                            gate,
                        } => {
                            run_command(&backend, &user_id, &completions, request_id, op, reply, gate)
                                .await;
                        }
                    }
                }
                debug!("Cart sync lane closed");
            }
            .instrument(span),
        );

        sender
    }
}

async fn run_command<B: CartBackend>(
    backend: &B,
    user_id: &UserId,
    completions: &mpsc::UnboundedSender<Completion>,
    request_id: Uuid,
    op: RemoteOp,
    reply: oneshot::Sender<SyncOutcome>,
    gate: Option<Gate>,
) {
    let done = match gate {
        Some(Gate { reached, done }) => {
            for lane in reached {
                let _ = lane.await;
            }
            Some(done)
        }
        None => None,
    };

    let outcome = match op.execute(backend, user_id).await {
        Ok(()) => {
            debug!(%request_id, op = op.kind(), "Cart sync confirmed");
            SyncOutcome::Confirmed
        }
        Err(e) => {
            warn!(%request_id, op = op.kind(), error = %e, "Cart sync failed");
            SyncOutcome::Failed(e.to_string())
        }
    };

    // Store first, so a caller woken by the ticket sees the completion
    let _ = completions.send(Completion {
        request_id,
        op,
        outcome: outcome.clone(),
    });
    let _ = reply.send(outcome);

    if let Some(done) = done {
        let _ = done.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agriverse_core::{Price, Quantity};

    fn item(id: &str) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: id.to_uppercase(),
            price: Price::from_units(10),
            image: String::new(),
            quantity: Quantity::ONE,
        }
    }

    #[test]
    fn test_remote_op_kinds() {
        assert_eq!(RemoteOp::Add(item("p1")).kind(), "add");
        assert_eq!(RemoteOp::Remove(item("p1")).kind(), "remove");
        assert_eq!(
            RemoteOp::Update {
                product_id: ProductId::new("p1"),
                action: QuantityAction::Decrease
            }
            .kind(),
            "decrease"
        );
        assert_eq!(RemoteOp::Clear(vec![]).kind(), "clear");
    }

    #[test]
    fn test_remote_op_lanes() {
        assert_eq!(
            RemoteOp::Remove(item("p7")).lane(),
            Lane::Product(ProductId::new("p7"))
        );
        assert_eq!(RemoteOp::Clear(vec![item("p7")]).lane(), Lane::Cart);
    }

    #[tokio::test]
    async fn test_skipped_ticket_resolves_immediately() {
        let ticket = SyncTicket::skipped();
        assert!(ticket.is_skipped());
        assert_eq!(ticket.request_id(), None);
        assert_eq!(ticket.outcome().await, SyncOutcome::Skipped);
    }
}
