//! The 401 policy and transport failures.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use shopfront_core::{Email, OrderId, ProductId};
use shopfront_integration_tests::{MockBackend, TestClient};
use shopfront_storefront::{ApiError, ClientConfig, SessionStore};

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

#[tokio::test]
async fn test_401_clears_session_and_redirects() {
    let backend = MockBackend::start().await.unwrap();
    let client = signed_in(&backend).await;
    backend.expire_sessions();

    let err = client.api.list_orders().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.status(), Some(401));
    assert!(client.session.get().unwrap().is_none());
    assert_eq!(client.redirect.count(), 1);

    // Subsequent requests go out without a credential
    client.api.list_products(Default::default()).await.unwrap();
    assert_eq!(backend.last_request().unwrap().authorization, None);
}

#[tokio::test]
async fn test_401_policy_applies_to_every_endpoint() {
    let backend = MockBackend::start().await.unwrap();
    let client = signed_in(&backend).await;

    for attempt in 1..=3 {
        backend.expire_sessions();
        let result = match attempt {
            1 => client.api.get_cart().await.map(drop),
            2 => client.api.add_cart_item(ProductId::new(1), 1).await,
            _ => client.api.clear_cart().await,
        };
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
        assert_eq!(client.redirect.count(), attempt);
    }
}

#[tokio::test]
async fn test_other_errors_keep_the_session() {
    let backend = MockBackend::start().await.unwrap();
    let client = signed_in(&backend).await;

    let not_found = client.api.get_order(OrderId::new(999)).await.unwrap_err();
    assert!(matches!(not_found, ApiError::Validation { status: 404, .. }));

    let missing_product = client
        .api
        .add_cart_item(ProductId::new(999), 1)
        .await
        .unwrap_err();
    assert_eq!(missing_product.user_message(), "Product not found");

    backend.fail_cart_fetches(Some(500));
    let server = client.api.get_cart().await.unwrap_err();
    assert!(matches!(server, ApiError::Server { status: 500, .. }));

    assert!(client.api.has_session());
    assert_eq!(client.redirect.count(), 0);
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(&format!("http://{addr}")).unwrap();
    let api = shopfront_storefront::ApiClient::from_config(&config).unwrap();

    let err = api.list_orders().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.status(), None);
}
