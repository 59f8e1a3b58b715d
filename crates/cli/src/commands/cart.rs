//! Cart commands.
//!
//! Every command mounts a fresh store for the logged-in user, applies the
//! change locally, waits for the backend to answer and prints the cart.
//!
//! # Usage
//!
//! ```bash
//! agriverse cart show
//! agriverse cart add --product-id p1 --name Rice --price 50
//! agriverse cart increase p1
//! agriverse cart clear
//! ```

use std::io::Write;

use agriverse_cart::{CartBackend, CartProvider, CartStore, HttpCartClient, SyncOutcome, SyncTicket};
use agriverse_core::{Price, Product, ProductId};
use clap::Subcommand;
use rust_decimal::Decimal;

use super::{CliError, Context};

#[derive(Subcommand)]
pub enum CartAction {
    /// Print the cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        #[arg(long)]
        product_id: String,

        /// Product name
        #[arg(long)]
        name: String,

        /// Unit price in rupees
        #[arg(long)]
        price: Decimal,

        /// Image URL
        #[arg(long, default_value = "")]
        image: String,

        /// Catalog category
        #[arg(long)]
        category: Option<String>,
    },
    /// Remove a product entirely
    Remove {
        /// Product id
        product_id: String,
    },
    /// Add one to a product's quantity
    Increase {
        /// Product id
        product_id: String,
    },
    /// Take one from a product's quantity (never below 1)
    Decrease {
        /// Product id
        product_id: String,
    },
    /// Remove every product
    Clear,
}

/// Run a cart command against the configured API.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the backend rejects
/// the change, or output cannot be written.
pub async fn run(ctx: &Context, action: CartAction) -> Result<(), CliError> {
    let client = HttpCartClient::new(&ctx.config)?;
    let identity = ctx.session.load_identity();
    if identity.is_none() {
        tracing::warn!("Not logged in; cart changes are ignored");
    }

    let mut provider = CartProvider::new(client, ctx.config.rollback);
    let store = provider.mount(identity).await;
    if let Some(failure) = store.clear_sync_error() {
        tracing::warn!(reason = %failure.reason, "Could not load cart");
    }

    let outcome = apply(store, action)?.outcome().await;
    store.settle().await;

    render(&mut std::io::stdout().lock(), store)?;

    match outcome {
        SyncOutcome::Failed(reason) => Err(CliError::SyncFailed(reason)),
        SyncOutcome::Confirmed | SyncOutcome::Skipped => Ok(()),
    }
}

fn apply<B: CartBackend>(store: &mut CartStore<B>, action: CartAction) -> Result<SyncTicket, CliError> {
    let ticket = match action {
        CartAction::Show => SyncTicket::skipped(),
        CartAction::Add {
            product_id,
            name,
            price,
            image,
            category,
        } => {
            let product = Product {
                id: ProductId::new(product_id),
                name,
                price: Price::new(price)?,
                image,
                category,
            };
            store.add_to_cart(&product)
        }
        CartAction::Remove { product_id } => store.remove_from_cart(&ProductId::new(product_id)),
        CartAction::Increase { product_id } => store.increase_qty(&ProductId::new(product_id)),
        CartAction::Decrease { product_id } => store.decrease_qty(&ProductId::new(product_id)),
        CartAction::Clear => store.clear_cart(),
    };
    Ok(ticket)
}

/// Write the cart as a table followed by totals.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render<B: CartBackend>(out: &mut impl Write, store: &CartStore<B>) -> std::io::Result<()> {
    if store.is_empty() {
        writeln!(out, "Cart is empty")?;
        return Ok(());
    }

    writeln!(out, "{:<26} {:<20} {:>4} {:>12}", "PRODUCT", "NAME", "QTY", "TOTAL")?;
    for item in store.items() {
        writeln!(
            out,
            "{:<26} {:<20} {:>4} {:>12}",
            item.product_id.as_str(),
            item.name,
            item.quantity.get(),
            item.line_total().to_string()
        )?;
    }
    writeln!(
        out,
        "{} item(s), subtotal {}",
        store.item_count(),
        store.subtotal()
    )?;
    Ok(())
}
