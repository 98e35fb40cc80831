//! `CartStore` behavior against a wiremock backend: aggregates, guard
//! rejections, single-flight, and identity-epoch discards.

use std::time::Duration;

use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lunaria_core::{CartItemId, ProductId};
use lunaria_integration_tests::{cart_item_json, cart_json, commerce_client, signed_in_identity};
use lunaria_session::{CartStore, IdentityHandle, StoreError};

#[tokio::test]
async fn reload_replaces_snapshot_and_recomputes_aggregates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(vec![
            cart_item_json(1, 42, 2, "50.00"),
            cart_item_json(2, 43, 1, "19.90"),
        ])))
        .mount(&server)
        .await;

    let (_identity, rx) = signed_in_identity();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);

    cart.reload().await.expect("reload should succeed");

    let state = cart.current();
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.total_items, 3);
    assert_eq!(state.total_price.amount, Decimal::new(11990, 2));
    assert!(!state.busy);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn anonymous_mutation_is_rejected_without_a_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let (_identity, rx) = IdentityHandle::new();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);

    let err = cart
        .add(ProductId::new(42), 1)
        .await
        .expect_err("anonymous add must fail");
    assert!(matches!(err, StoreError::NotSignedIn));
}

#[tokio::test]
async fn zero_quantity_add_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let (_identity, rx) = signed_in_identity();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);

    let err = cart
        .add(ProductId::new(42), 0)
        .await
        .expect_err("zero quantity must fail");
    assert!(matches!(err, StoreError::InvalidQuantity(0)));
}

#[tokio::test]
async fn zero_quantity_update_removes_the_line() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/cart/items/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let (_identity, rx) = signed_in_identity();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);

    cart.update_quantity(CartItemId::new(7), 0)
        .await
        .expect("update to zero should remove");
    assert!(cart.current().is_empty());
}

#[tokio::test]
async fn failed_reload_falls_back_to_empty_with_error_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (_identity, rx) = signed_in_identity();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);

    let err = cart.reload().await.expect_err("reload should fail");
    assert!(matches!(err, StoreError::Api(_)));

    let state = cart.current();
    assert!(state.is_empty());
    assert!(state.error.is_some());
    assert!(!state.busy);
}

#[tokio::test]
async fn failed_mutation_keeps_the_prior_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(vec![cart_item_json(1, 42, 1, "19.90")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (_identity, rx) = signed_in_identity();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);
    cart.reload().await.expect("reload should succeed");

    cart.add(ProductId::new(43), 1)
        .await
        .expect_err("add should fail");

    let state = cart.current();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.total_items, 1);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn same_action_is_single_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(vec![cart_item_json(1, 42, 1, "19.90")]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_identity, rx) = signed_in_identity();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);

    // Double-click: same product, same action key, overlapping in time.
    let (first, second) = tokio::join!(cart.add(ProductId::new(42), 1), cart.add(ProductId::new(42), 1));

    assert!(first.is_ok());
    assert!(matches!(second, Err(StoreError::Busy(_))));
    assert_eq!(cart.current().total_items, 1);
}

#[tokio::test]
async fn response_from_a_previous_epoch_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(vec![cart_item_json(1, 42, 5, "19.90")]))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let (identity, rx) = signed_in_identity();
    let cart = CartStore::new(commerce_client(&server.uri()), rx);

    let store = cart.clone();
    let reload = tokio::spawn(async move { store.reload().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    identity.sign_out();

    let result = reload.await.expect("task should not panic");
    assert!(matches!(result, Err(StoreError::Stale)));

    // The signed-out session never sees the old shopper's items.
    let state = cart.current();
    assert!(state.is_empty());
    assert!(!state.busy);
}
