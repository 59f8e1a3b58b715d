//! Cart store and provider over real HTTP.
//!
//! Run with: cargo test -p agriverse-integration-tests

#![allow(clippy::unwrap_used)]

use agriverse_cart::{CartProvider, CartStore, RollbackPolicy, SessionStore, SessionUser, SyncOutcome};
use agriverse_core::{Price, Product, ProductId, UserId};
use agriverse_integration_tests::{MockCartServer, cart_line};
use reqwest::{Method, StatusCode};

fn product(id: &str, name: &str, price: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Price::from_units(price),
        image: format!("{}.jpg", name.to_lowercase()),
        category: Some("Grains".to_string()),
    }
}

#[tokio::test]
async fn test_rice_scenario_stays_in_step_with_backend() {
    let server = MockCartServer::start().await.unwrap();
    let user = UserId::new("u1");
    let rice = product("p1", "Rice", 50);

    let mut store = CartStore::open(server.client(), Some(user), RollbackPolicy::Keep).await;
    assert!(store.is_empty());

    store.add_to_cart(&rice);
    store.increase_qty(&rice.id);
    store.increase_qty(&rice.id);
    store.decrease_qty(&rice.id);
    assert_eq!(store.quantity_of(&rice.id), 2);

    store.settle().await;
    assert!(!store.has_pending());
    assert!(store.last_sync_error().is_none());

    let remote = server.cart("u1");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0]["quantity"], 2);
    assert_eq!(store.subtotal(), Price::from_units(100));

    let methods: Vec<_> = server.mutations().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::POST, Method::PUT, Method::PUT, Method::PUT]);
}

#[tokio::test]
async fn test_adding_existing_product_increases_quantity() {
    let server = MockCartServer::start().await.unwrap();
    server.set_cart("u1", vec![cart_line("p1", "Rice", 50, 1)]);
    let rice = product("p1", "Rice", 50);

    let mut store = CartStore::open(server.client(), Some(UserId::new("u1")), RollbackPolicy::Keep).await;
    let outcome = store.add_to_cart(&rice).outcome().await;
    store.settle().await;

    assert_eq!(outcome, SyncOutcome::Confirmed);
    assert_eq!(store.len(), 1);
    assert_eq!(store.quantity_of(&rice.id), 2);

    let requests = server.mutations();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/cart/update");
    assert_eq!(server.cart("u1")[0]["quantity"], 2);
}

#[tokio::test]
async fn test_remove_and_clear_reach_backend() {
    let server = MockCartServer::start().await.unwrap();
    server.set_cart(
        "u1",
        vec![
            cart_line("p1", "Rice", 50, 1),
            cart_line("p2", "Wheat", 30, 2),
            cart_line("p3", "Millet", 40, 1),
        ],
    );

    let mut store = CartStore::open(server.client(), Some(UserId::new("u1")), RollbackPolicy::Keep).await;
    assert_eq!(store.item_count(), 4);

    let removed = store.remove_from_cart(&ProductId::new("p2"));
    assert!(!store.contains(&ProductId::new("p2")));
    assert_eq!(removed.outcome().await, SyncOutcome::Confirmed);
    assert_eq!(server.cart("u1").len(), 2);

    let cleared = store.clear_cart();
    assert!(store.is_empty());
    assert_eq!(cleared.outcome().await, SyncOutcome::Confirmed);
    store.settle().await;
    assert!(server.cart("u1").is_empty());
}

#[tokio::test]
async fn test_load_failure_starts_empty_and_records_error() {
    let server = MockCartServer::start().await.unwrap();
    server.set_cart("u1", vec![cart_line("p1", "Rice", 50, 1)]);
    server.fail_with(Some(StatusCode::SERVICE_UNAVAILABLE));

    let store = CartStore::open(server.client(), Some(UserId::new("u1")), RollbackPolicy::Keep).await;

    assert!(store.is_empty());
    let failure = store.last_sync_error().unwrap();
    assert_eq!(failure.operation, "load");
    assert!(failure.reason.contains("503"));
}

#[tokio::test]
async fn test_failed_add_is_kept_under_keep_policy() {
    let server = MockCartServer::start().await.unwrap();
    let rice = product("p1", "Rice", 50);
    let mut store = CartStore::open(server.client(), Some(UserId::new("u1")), RollbackPolicy::Keep).await;

    server.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR));
    let outcome = store.add_to_cart(&rice).outcome().await;
    store.settle().await;

    assert!(outcome.is_failed());
    assert_eq!(store.quantity_of(&rice.id), 1);
    let failure = store.last_sync_error().unwrap();
    assert_eq!(failure.operation, "add");
    assert_eq!(failure.product_id, Some(rice.id.clone()));
}

#[tokio::test]
async fn test_failed_changes_are_undone_under_revert_policy() {
    let server = MockCartServer::start().await.unwrap();
    server.set_cart("u1", vec![cart_line("p1", "Rice", 50, 2)]);
    let mut store = CartStore::open(server.client(), Some(UserId::new("u1")), RollbackPolicy::Revert).await;
    let rice = ProductId::new("p1");

    server.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR));

    store.increase_qty(&rice);
    assert_eq!(store.quantity_of(&rice), 3);
    store.settle().await;
    assert_eq!(store.quantity_of(&rice), 2);

    store.remove_from_cart(&rice);
    assert!(!store.contains(&rice));
    store.settle().await;
    assert_eq!(store.quantity_of(&rice), 2);

    store.add_to_cart(&product("p9", "Barley", 25));
    store.settle().await;
    assert!(!store.contains(&ProductId::new("p9")));
    assert_eq!(server.cart("u1")[0]["quantity"], 2);
}

#[tokio::test]
async fn test_logged_out_store_never_calls_backend() {
    let server = MockCartServer::start().await.unwrap();
    let rice = product("p1", "Rice", 50);

    let mut store = CartStore::open(server.client(), None, RollbackPolicy::Keep).await;
    assert!(store.add_to_cart(&rice).is_skipped());
    assert!(store.increase_qty(&rice.id).is_skipped());
    assert!(store.clear_cart().is_skipped());
    store.settle().await;

    assert!(store.is_empty());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_provider_follows_login_and_logout() {
    let server = MockCartServer::start().await.unwrap();
    server.set_cart("u1", vec![cart_line("p1", "Rice", 50, 1)]);
    server.set_cart("u2", vec![cart_line("p2", "Wheat", 30, 3)]);

    let mut provider = CartProvider::new(server.client(), RollbackPolicy::Keep);
    assert!(provider.cart().is_err());

    provider.mount(Some(UserId::new("u1"))).await;
    assert!(provider.cart().unwrap().contains(&ProductId::new("p1")));

    assert!(!provider.switch_identity(Some(UserId::new("u1"))).await);
    assert!(provider.switch_identity(Some(UserId::new("u2"))).await);
    let cart = provider.cart().unwrap();
    assert!(!cart.contains(&ProductId::new("p1")));
    assert_eq!(cart.quantity_of(&ProductId::new("p2")), 3);

    assert!(provider.switch_identity(None).await);
    assert!(provider.cart().unwrap().is_empty());

    let loads: Vec<_> = server.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(loads, vec!["/api/cart/u1", "/api/cart/u2"]);
}

#[tokio::test]
async fn test_identity_from_session_record() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionStore::new(dir.path().join("session.json"));
    session
        .save(&SessionUser {
            id: Some(UserId::new("u1")),
            name: Some("Asha".to_string()),
            role: Some("Buyer".to_string()),
        })
        .unwrap();

    let server = MockCartServer::start().await.unwrap();
    server.set_cart("u1", vec![cart_line("p1", "Rice", 50, 4)]);

    let mut provider = CartProvider::new(server.client(), RollbackPolicy::Keep);
    let cart = provider.mount(session.load_identity()).await;
    assert_eq!(cart.item_count(), 4);

    session.clear().unwrap();
    assert!(provider.switch_identity(session.load_identity()).await);
    assert!(provider.cart().unwrap().is_empty());
}
