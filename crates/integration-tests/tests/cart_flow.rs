//! Cart manager driven end to end through the API client.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use shopfront_core::{CartItem, CartItemId, Email, UserProfile, cart_item_count};
use shopfront_integration_tests::{MockBackend, TestClient};
use shopfront_storefront::{
    ApiClient, ApiError, CartManager, ClientConfig, LogRedirect, MemorySessionStore,
    SessionCredential,
};

async fn signed_in(backend: &MockBackend) -> TestClient {
    backend.seed_user("shopper@example.com", "secret");
    let client = backend.client().unwrap();
    client
        .api
        .login(
            &Email::parse("shopper@example.com").unwrap(),
            &SecretString::from("secret".to_string()),
        )
        .await
        .unwrap();
    client
}

fn line_for(items: &[CartItem], name: &str) -> CartItemId {
    items.iter().find(|i| i.name == name).unwrap().id
}

#[tokio::test]
async fn test_initialize_without_session_makes_no_request() {
    let backend = MockBackend::start().await.unwrap();
    let client = backend.client().unwrap();

    let cart = CartManager::new(client.api.clone());
    cart.initialize().await;

    assert!(cart.items().await.is_empty());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_add_update_remove_each_refetch_once() {
    let backend = MockBackend::start().await.unwrap();
    let pen = backend.seed_product("Pen", 10.0, 10, false);
    let pad = backend.seed_product("Pad", 5.0, 10, false);
    let client = signed_in(&backend).await;

    let cart = CartManager::new(client.api.clone());
    cart.initialize().await;
    assert_eq!(backend.count("GET", "/api/cart"), 1);

    let mark = backend.requests().len();
    cart.add(pen, 2).await.unwrap();
    let traffic: Vec<_> = backend
        .requests_since(mark)
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    assert_eq!(
        traffic,
        vec![
            ("POST".to_string(), "/api/cart/items".to_string()),
            ("GET".to_string(), "/api/cart".to_string()),
        ]
    );
    assert!(!cart.is_loading());

    cart.add(pad, 1).await.unwrap();
    let snapshot = cart.snapshot().await;
    assert_eq!(snapshot.total_price, Decimal::new(25, 0));
    assert_eq!(snapshot.item_count, 3);

    let add_body = backend.requests_since(mark)[2].json.clone().unwrap();
    assert_eq!(add_body, serde_json::json!({ "product_id": pad.get(), "quantity": 1 }));

    let pen_line = line_for(&snapshot.items, "Pen");
    cart.update(pen_line, 5).await.unwrap();
    assert_eq!(cart.item_count().await, 6);
    assert_eq!(backend.count("GET", "/api/cart"), 4);

    cart.remove(pen_line).await.unwrap();
    assert_eq!(cart.item_count().await, 1);
    assert_eq!(cart.total_price().await, Decimal::new(5, 0));
    assert_eq!(backend.count("GET", "/api/cart"), 5);
    assert_eq!(
        backend.count("DELETE", &format!("/api/cart/items/{pen_line}")),
        1
    );
}

#[tokio::test]
async fn test_clear_empties_without_refetch() {
    let backend = MockBackend::start().await.unwrap();
    let pen = backend.seed_product("Pen", 10.0, 10, false);
    let client = signed_in(&backend).await;

    let cart = CartManager::new(client.api.clone());
    cart.add(pen, 1).await.unwrap();
    let fetches = backend.count("GET", "/api/cart");

    cart.clear().await.unwrap();

    assert!(cart.items().await.is_empty());
    assert_eq!(backend.count("DELETE", "/api/cart"), 1);
    assert_eq!(backend.count("GET", "/api/cart"), fetches);
    assert!(client.api.get_cart().await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_rejected_add_propagates_and_keeps_mirror() {
    let backend = MockBackend::start().await.unwrap();
    let pen = backend.seed_product("Pen", 10.0, 2, false);
    let client = signed_in(&backend).await;

    let cart = CartManager::new(client.api.clone());
    cart.add(pen, 2).await.unwrap();
    let fetches = backend.count("GET", "/api/cart");

    let err = cart.add(pen, 1).await.unwrap_err();

    assert!(matches!(&err, ApiError::Validation { status: 400, message } if message == "Insufficient stock"));
    assert_eq!(cart.item_count().await, 2);
    assert_eq!(backend.count("GET", "/api/cart"), fetches);
    assert!(!cart.is_loading());
}

#[tokio::test]
async fn test_fetch_failure_degrades_to_empty_cart() {
    let backend = MockBackend::start().await.unwrap();
    let pen = backend.seed_product("Pen", 10.0, 10, false);
    let client = signed_in(&backend).await;

    let cart = CartManager::new(client.api.clone());
    cart.add(pen, 1).await.unwrap();
    assert_eq!(cart.item_count().await, 1);

    backend.fail_cart_fetches(Some(503));
    cart.fetch().await;

    assert!(cart.items().await.is_empty());
    assert!(client.api.has_session());
    assert_eq!(client.redirect.count(), 0);
}

#[tokio::test]
async fn test_expired_session_degrades_and_redirects() {
    let backend = MockBackend::start().await.unwrap();
    let client = signed_in(&backend).await;
    backend.expire_sessions();

    let cart = CartManager::new(client.api.clone());
    cart.initialize().await;

    assert!(cart.items().await.is_empty());
    assert!(!client.api.has_session());
    assert_eq!(client.redirect.count(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_degrades_to_empty_cart() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(&format!("http://{addr}")).unwrap();
    let session = MemorySessionStore::with_credential(SessionCredential::new(
        "stale-token",
        UserProfile {
            id: None,
            name: None,
            email: Email::parse("shopper@example.com").unwrap(),
        },
    ));
    let api = ApiClient::new(&config, Arc::new(session), Arc::new(LogRedirect)).unwrap();

    let cart = CartManager::new(api);
    cart.initialize().await;

    assert_eq!(cart_item_count(&cart.items().await), 0);
    assert!(!cart.is_loading());
}
