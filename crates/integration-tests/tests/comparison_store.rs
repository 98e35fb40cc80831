//! `ComparisonStore` behavior: catalog resolution, the entry cap, and file
//! persistence across store instances.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lunaria_core::ProductId;
use lunaria_integration_tests::{commerce_client, product_json};
use lunaria_session::{CompareOutcome, ComparisonStore, MAX_COMPARE};

#[tokio::test]
async fn add_resolves_the_product_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(42, "19.90")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("compare.json");

    let store = ComparisonStore::load(commerce_client(&server.uri()), &file);
    let outcome = store
        .add(ProductId::new(42))
        .await
        .expect("add should succeed");
    assert_eq!(outcome, CompareOutcome::Added);

    // A fresh store over the same file sees the pinned product.
    let reopened = ComparisonStore::load(commerce_client(&server.uri()), &file);
    assert!(reopened.contains(ProductId::new(42)));
}

#[tokio::test]
async fn duplicate_add_is_reported_without_a_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(42, "19.90")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = ComparisonStore::load(commerce_client(&server.uri()), dir.path().join("c.json"));

    assert_eq!(
        store.add(ProductId::new(42)).await.expect("first add"),
        CompareOutcome::Added
    );
    assert_eq!(
        store.add(ProductId::new(42)).await.expect("second add"),
        CompareOutcome::AlreadyPresent
    );
}

#[tokio::test]
async fn fifth_product_hits_the_limit_before_any_network_call() {
    let server = MockServer::start().await;
    for id in 1..=4 {
        Mock::given(method("GET"))
            .and(path(format!("/products/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(product_json(id, "10.00")))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/products/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(5, "10.00")))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = ComparisonStore::load(commerce_client(&server.uri()), dir.path().join("c.json"));

    for id in 1..=4 {
        assert_eq!(
            store.add(ProductId::new(id)).await.expect("add"),
            CompareOutcome::Added
        );
    }
    assert_eq!(store.current().entries.len(), MAX_COMPARE);
    assert_eq!(
        store.add(ProductId::new(5)).await.expect("fifth add"),
        CompareOutcome::LimitReached
    );
}

#[tokio::test]
async fn vanished_product_is_reported_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = ComparisonStore::load(commerce_client(&server.uri()), dir.path().join("c.json"));

    assert_eq!(
        store.add(ProductId::new(99)).await.expect("add"),
        CompareOutcome::Unavailable
    );
    assert!(store.current().entries.is_empty());
}

#[tokio::test]
async fn remove_and_clear_update_the_file() {
    let server = MockServer::start().await;
    for id in [1, 2] {
        Mock::given(method("GET"))
            .and(path(format!("/products/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(product_json(id, "10.00")))
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("c.json");
    let store = ComparisonStore::load(commerce_client(&server.uri()), &file);

    store.add(ProductId::new(1)).await.expect("add");
    store.add(ProductId::new(2)).await.expect("add");

    assert!(store.remove(ProductId::new(1)));
    assert!(!store.remove(ProductId::new(1)));

    let reopened = ComparisonStore::load(commerce_client(&server.uri()), &file);
    assert!(!reopened.contains(ProductId::new(1)));
    assert!(reopened.contains(ProductId::new(2)));

    store.clear();
    let reopened = ComparisonStore::load(commerce_client(&server.uri()), &file);
    assert!(reopened.current().entries.is_empty());
}
