//! Integration tests for the AgriVerse cart client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p agriverse-integration-tests
//! ```
//!
//! Tests run against [`MockCartServer`], an in-process axum app that speaks
//! the marketplace cart API on an ephemeral port. No external services are
//! needed.
//!
//! # Test Categories
//!
//! - `http_client` - Request shapes and response handling of `HttpCartClient`
//! - `cart_flow` - Store and provider behavior over real HTTP

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agriverse_cart::HttpCartClient;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// A request the mock server received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct MockState {
    carts: HashMap<String, Vec<Value>>,
    requests: Vec<RecordedRequest>,
    fail_with: Option<StatusCode>,
    load_override: Option<Value>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process cart API.
///
/// Mirrors the marketplace backend: adding an existing product bumps its
/// quantity, `decrease` stops at 1 and every mutation answers with a small
/// JSON message.
pub struct MockCartServer {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl MockCartServer {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Shared::default();
        let app = Router::new()
            .route("/api/cart/{user_id}", get(load_cart))
            .route("/api/cart/add", post(add_item))
            .route("/api/cart/remove/{user_id}/{product_id}", delete(remove_item))
            .route("/api/cart/update", put(update_quantity))
            .route("/api/cart/clear/{user_id}", delete(clear_cart))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL of the server.
    ///
    /// # Panics
    ///
    /// Never in practice; a socket address always forms a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    /// Cart client pointed at this server.
    #[must_use]
    pub fn client(&self) -> HttpCartClient {
        HttpCartClient::with_client(reqwest::Client::new(), &self.url())
    }

    /// Replace a user's stored cart.
    pub fn set_cart(&self, user_id: &str, items: Vec<Value>) {
        lock(&self.state).carts.insert(user_id.to_string(), items);
    }

    /// A user's stored cart.
    #[must_use]
    pub fn cart(&self, user_id: &str) -> Vec<Value> {
        lock(&self.state)
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Answer every request with `status` until reset with `None`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        lock(&self.state).fail_with = status;
    }

    /// Answer cart loads with `body` instead of the stored cart.
    pub fn override_load(&self, body: Option<Value>) {
        lock(&self.state).load_override = body;
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests excluding cart loads.
    #[must_use]
    pub fn mutations(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != Method::GET)
            .collect()
    }
}

impl Drop for MockCartServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Log the request and return the configured failure, if any.
fn record(state: &Shared, method: Method, path: String, body: Option<Value>) -> Option<StatusCode> {
    let mut guard = lock(state);
    guard.requests.push(RecordedRequest { method, path, body });
    guard.fail_with
}

fn failure(status: StatusCode) -> Response {
    (status, Json(json!({ "error": "mock failure" }))).into_response()
}

fn message(text: &str) -> Response {
    Json(json!({ "message": text })).into_response()
}

fn product_id_of(item: &Value) -> Option<&str> {
    item.get("productId").and_then(Value::as_str)
}

async fn load_cart(State(state): State<Shared>, Path(user_id): Path<String>) -> Response {
    if let Some(status) = record(&state, Method::GET, format!("/api/cart/{user_id}"), None) {
        return failure(status);
    }

    let guard = lock(&state);
    let body = guard.load_override.clone().unwrap_or_else(|| {
        Value::Array(guard.carts.get(&user_id).cloned().unwrap_or_default())
    });
    Json(body).into_response()
}

async fn add_item(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if let Some(status) = record(&state, Method::POST, "/api/cart/add".to_string(), Some(body.clone())) {
        return failure(status);
    }

    let Some(user_id) = body.get("userId").and_then(Value::as_str) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some(product_id) = product_id_of(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut guard = lock(&state);
    let cart = guard.carts.entry(user_id.to_string()).or_default();
    if let Some(existing) = cart.iter_mut().find(|i| product_id_of(i) == Some(product_id)) {
        let qty = existing.get("quantity").and_then(Value::as_u64).unwrap_or(1);
        existing["quantity"] = json!(qty + 1);
        return message("Quantity increased");
    }

    let mut item = body.clone();
    if let Some(fields) = item.as_object_mut() {
        fields.remove("userId");
        fields.insert("quantity".to_string(), json!(1));
    }
    cart.push(item);
    message("Added to cart")
}

async fn remove_item(
    State(state): State<Shared>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> Response {
    let path = format!("/api/cart/remove/{user_id}/{product_id}");
    if let Some(status) = record(&state, Method::DELETE, path, None) {
        return failure(status);
    }

    if let Some(cart) = lock(&state).carts.get_mut(&user_id) {
        cart.retain(|i| product_id_of(i) != Some(product_id.as_str()));
    }
    message("Item removed")
}

async fn update_quantity(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if let Some(status) = record(&state, Method::PUT, "/api/cart/update".to_string(), Some(body.clone())) {
        return failure(status);
    }

    let user_id = body.get("userId").and_then(Value::as_str).unwrap_or_default();
    let product_id = product_id_of(&body).unwrap_or_default();
    let action = body.get("action").and_then(Value::as_str).unwrap_or_default();

    let mut guard = lock(&state);
    let Some(item) = guard
        .carts
        .get_mut(user_id)
        .and_then(|cart| cart.iter_mut().find(|i| product_id_of(i) == Some(product_id)))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let qty = item.get("quantity").and_then(Value::as_u64).unwrap_or(1);
    let next = match action {
        "increase" => qty + 1,
        "decrease" => qty.saturating_sub(1).max(1),
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };
    item["quantity"] = json!(next);
    message("Quantity updated")
}

async fn clear_cart(State(state): State<Shared>, Path(user_id): Path<String>) -> Response {
    if let Some(status) = record(&state, Method::DELETE, format!("/api/cart/clear/{user_id}"), None) {
        return failure(status);
    }

    lock(&state).carts.remove(&user_id);
    message("Cart cleared")
}

/// Stored cart line in the backend's JSON shape.
#[must_use]
pub fn cart_line(product_id: &str, name: &str, price: u32, quantity: u32) -> Value {
    json!({
        "productId": product_id,
        "name": name,
        "price": price,
        "image": format!("{}.jpg", name.to_lowercase()),
        "quantity": quantity,
    })
}
