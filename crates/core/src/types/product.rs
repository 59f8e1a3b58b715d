//! Catalog product record as returned by the marketplace listing.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product listed in the marketplace.
///
/// Only the fields the cart needs are typed; anything else the catalog
/// returns is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend document id.
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
