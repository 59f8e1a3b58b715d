//! Marketplace cart API client.
//!
//! # Endpoints
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | Load cart | GET | `/api/cart/{userId}` |
//! | Add item | POST | `/api/cart/add` |
//! | Remove item | DELETE | `/api/cart/remove/{userId}/{productId}` |
//! | Update quantity | PUT | `/api/cart/update` |
//! | Clear cart | DELETE | `/api/cart/clear/{userId}` |
//!
//! Mutation responses are not inspected beyond their status code.

use agriverse_core::{LineItem, ProductId, QuantityAction, UserId};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::backend::CartBackend;
use crate::config::CartConfig;
use crate::error::{CartError, Result};

/// HTTP implementation of [`CartBackend`].
#[derive(Debug, Clone)]
pub struct HttpCartClient {
    /// HTTP client.
    client: Client,
    /// API origin without trailing slash.
    base_url: String,
}

/// Body of `POST /api/cart/add`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItemRequest<'a> {
    user_id: &'a UserId,
    #[serde(flatten)]
    item: &'a LineItem,
}

/// Body of `PUT /api/cart/update`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateQuantityRequest<'a> {
    user_id: &'a UserId,
    product_id: &'a ProductId,
    action: QuantityAction,
}

impl HttpCartClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new(config: &CartConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(client, &config.api_url))
    }

    /// Create a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: Client, base_url: &Url) -> Self {
        Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    /// API origin this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl CartBackend for HttpCartClient {
    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn load_cart(&self, user_id: &UserId) -> Result<Vec<LineItem>> {
        let path = format!("/api/cart/{}", urlencoding::encode(user_id.as_str()));

        let response = self.client.get(self.url(&path)).send().await?;
        let body = ensure_success(response, &path)?.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;

        decode_cart(value)
    }

    #[instrument(skip_all, fields(user_id = %user_id, product_id = %item.product_id))]
    async fn add_item(&self, user_id: &UserId, item: &LineItem) -> Result<()> {
        let path = "/api/cart/add";
        let response = self
            .client
            .post(self.url(path))
            .json(&AddItemRequest { user_id, item })
            .send()
            .await?;

        ensure_success(response, path)?;
        debug!("Cart item added");
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    async fn remove_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<()> {
        let path = format!(
            "/api/cart/remove/{}/{}",
            urlencoding::encode(user_id.as_str()),
            urlencoding::encode(product_id.as_str())
        );
        let response = self.client.delete(self.url(&path)).send().await?;

        ensure_success(response, &path)?;
        debug!("Cart item removed");
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id, action = %action))]
    async fn update_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        action: QuantityAction,
    ) -> Result<()> {
        let path = "/api/cart/update";
        let response = self
            .client
            .put(self.url(path))
            .json(&UpdateQuantityRequest {
                user_id,
                product_id,
                action,
            })
            .send()
            .await?;

        ensure_success(response, path)?;
        debug!("Cart quantity updated");
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn clear_cart(&self, user_id: &UserId) -> Result<()> {
        let path = format!("/api/cart/clear/{}", urlencoding::encode(user_id.as_str()));
        let response = self.client.delete(self.url(&path)).send().await?;

        ensure_success(response, &path)?;
        debug!("Cart cleared");
        Ok(())
    }
}

/// Turn non-2xx responses into [`CartError::Status`].
fn ensure_success(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CartError::Status {
            status,
            path: path.to_string(),
        })
    }
}

/// Type-check a load payload.
///
/// Arrays must hold well-formed line items; any other JSON shape is treated
/// as an empty cart.
pub(crate) fn decode_cart(value: serde_json::Value) -> Result<Vec<LineItem>> {
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        other => {
            debug!(kind = json_kind(&other), "Cart payload is not an array, treating as empty");
            Ok(Vec::new())
        }
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
