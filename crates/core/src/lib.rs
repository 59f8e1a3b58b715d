//! AgriVerse Core - Shared types library.
//!
//! This crate provides the domain types used across all AgriVerse components:
//! - `cart` - Cart store, sync queue and HTTP client for the marketplace backend
//! - `cli` - Command-line front end for the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and quantities, plus the
//!   cart line item and catalog product records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
