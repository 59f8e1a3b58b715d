//! AgriVerse Cart - client-side cart store for the marketplace.
//!
//! # Architecture
//!
//! - [`CartStore`] holds the ordered line items of one identity and applies
//!   every mutation locally before the backend hears about it
//! - A per-product sync queue sends the matching API calls in order and
//!   reports each result through a [`SyncTicket`]
//! - [`CartProvider`] owns the current store and swaps it when the logged-in
//!   user changes
//! - [`CartBackend`] is the seam to the remote cart; [`HttpCartClient`] is
//!   the `reqwest` implementation
//! - [`SessionStore`] reads the logged-in user from the persisted session
//!   record
//!
//! # Example
//!
//! ```rust,ignore
//! use agriverse_cart::{CartConfig, CartProvider, HttpCartClient, SessionStore};
//!
//! let config = CartConfig::from_env()?;
//! let client = HttpCartClient::new(&config)?;
//! let identity = SessionStore::at_default_location()?.load_identity();
//!
//! let mut provider = CartProvider::new(client, config.rollback);
//! let cart = provider.mount(identity).await;
//! let ticket = cart.add_to_cart(&product);
//! // Local state already has the item; the ticket tells us if the API agreed
//! let outcome = ticket.outcome().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod backend;
mod client;
pub mod config;
mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
mod provider;
pub mod session;
mod store;
mod sync;

pub use backend::CartBackend;
pub use client::HttpCartClient;
pub use config::{CartConfig, ConfigError};
pub use error::{CartError, Result, SessionError};
pub use provider::CartProvider;
pub use session::{SessionStore, SessionUser};
pub use store::{CartStore, RollbackPolicy, SyncFailure};
pub use sync::{RemoteOp, SyncOutcome, SyncTicket};
