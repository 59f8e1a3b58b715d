//! Core types for AgriVerse.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod id;
pub mod line_item;
pub mod price;
pub mod product;
pub mod quantity;

pub use id::*;
pub use line_item::{LineItem, QuantityAction};
pub use price::{Price, PriceError};
pub use product::Product;
pub use quantity::{Quantity, QuantityError};
