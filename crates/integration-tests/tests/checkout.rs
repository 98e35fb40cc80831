//! `CheckoutFlow` state machine against a mock backend and a mock payment
//! gateway.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lunaria_api::CardDetails;
use lunaria_core::{AddressId, PaymentMethod, ProductId};
use lunaria_integration_tests::{
    address_json, cart_item_json, cart_json, commerce_client, order_json, payment_client,
    signed_in_identity, test_user,
};
use lunaria_session::{
    CartStore, CheckoutError, CheckoutFailure, CheckoutFlow, CheckoutStage, IdentityHandle,
};

struct Harness {
    server: MockServer,
    gateway: MockServer,
    identity: IdentityHandle,
    cart: CartStore,
    flow: CheckoutFlow,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let gateway = MockServer::start().await;
    let client = commerce_client(&server.uri());
    let (identity, rx) = signed_in_identity();
    let cart = CartStore::new(client.clone(), rx.clone());
    let flow = CheckoutFlow::new(client, payment_client(&gateway.uri()), cart.clone(), rx);
    Harness {
        server,
        gateway,
        identity,
        cart,
        flow,
    }
}

async fn mount_cart_with_one_item(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(vec![cart_item_json(1, 42, 1, "19.90")])),
        )
        .mount(server)
        .await;
}

async fn mount_default_address(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/7/addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([address_json(3, true)])))
        .mount(server)
        .await;
}

fn test_card() -> CardDetails {
    CardDetails {
        cardholder_name: "Ada Byron".to_string(),
        number: SecretString::from("4242424242424242"),
        exp_month: 12,
        exp_year: 2030,
        cvc: SecretString::from("123"),
    }
}

#[tokio::test]
async fn card_checkout_runs_end_to_end() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/v1/card-authorizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "auth_123" })))
        .expect(1)
        .mount(&h.gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({
            "shippingAddressId": 3,
            "billingAddressId": 3,
            "paymentMethod": "CARD",
            "paymentConfirmationId": "auth_123",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(order_json(500, "19.90", "CARD")))
        .expect(1)
        .mount(&h.server)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    assert_eq!(h.flow.stage(), CheckoutStage::SelectingAddress);

    h.flow
        .select_address(AddressId::new(3))
        .expect("address is in the book");
    assert_eq!(h.flow.stage(), CheckoutStage::SelectingPayment);

    h.flow
        .select_payment(PaymentMethod::Card)
        .expect("method selection");
    assert_eq!(h.flow.stage(), CheckoutStage::AuthorizingPayment);

    h.flow
        .authorize(test_card())
        .await
        .expect("authorization should succeed");
    assert_eq!(h.flow.stage(), CheckoutStage::CreatingOrder);

    let order = h.flow.submit().await.expect("submission should succeed");
    assert_eq!(order.id.as_i64(), 500);
    assert!(matches!(h.flow.stage(), CheckoutStage::Completed(_)));

    // Order creation consumed the cart server-side; the store reflects it.
    assert!(h.cart.current().is_empty());
}

#[tokio::test]
async fn begin_requires_a_non_empty_cart() {
    let h = harness().await;

    let err = h.flow.begin().await.expect_err("empty cart must fail");
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(h.flow.stage(), CheckoutStage::Idle);
}

#[tokio::test]
async fn unknown_address_is_rejected() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");

    let err = h
        .flow
        .select_address(AddressId::new(77))
        .expect_err("address 77 is not saved");
    assert!(matches!(err, CheckoutError::UnknownAddress(_)));
    assert_eq!(h.flow.stage(), CheckoutStage::SelectingAddress);
}

#[tokio::test]
async fn operations_out_of_order_are_rejected() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");

    let err = h
        .flow
        .select_payment(PaymentMethod::Card)
        .expect_err("payment before address must fail");
    assert!(matches!(err, CheckoutError::WrongStage { .. }));

    let err = h.flow.submit().await.expect_err("submit from entry stage");
    assert!(matches!(err, CheckoutError::WrongStage { .. }));
}

#[tokio::test]
async fn declined_card_is_resumable() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    // First attempt declines, second succeeds.
    Mock::given(method("POST"))
        .and(path("/v1/card-authorizations"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "code": "card_declined", "message": "insufficient funds" }
        })))
        .up_to_n_times(1)
        .mount(&h.gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/card-authorizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "auth_456" })))
        .mount(&h.gateway)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    h.flow.select_address(AddressId::new(3)).expect("select");
    h.flow.select_payment(PaymentMethod::Card).expect("select");

    let err = h
        .flow
        .authorize(test_card())
        .await
        .expect_err("decline must fail");
    assert!(matches!(err, CheckoutError::Payment(_)));
    assert!(matches!(
        h.flow.stage(),
        CheckoutStage::Failed(CheckoutFailure::PaymentRejected { .. })
    ));

    // Address and method selections survive the decline.
    h.flow.retry_payment().expect("decline is resumable");
    assert_eq!(h.flow.stage(), CheckoutStage::AuthorizingPayment);
    h.flow
        .authorize(test_card())
        .await
        .expect("second card should authorize");
    assert_eq!(h.flow.stage(), CheckoutStage::CreatingOrder);
}

#[tokio::test]
async fn cash_on_delivery_skips_the_gateway() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/v1/card-authorizations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({
            "shippingAddressId": 3,
            "billingAddressId": 3,
            "paymentMethod": "CASH_ON_DELIVERY",
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(order_json(501, "19.90", "CASH_ON_DELIVERY")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    h.flow.select_address(AddressId::new(3)).expect("select");
    h.flow
        .select_payment(PaymentMethod::CashOnDelivery)
        .expect("select");
    assert_eq!(h.flow.stage(), CheckoutStage::CreatingOrder);

    h.flow.submit().await.expect("submission should succeed");
}

#[tokio::test]
async fn double_submit_sends_exactly_one_request() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(order_json(502, "19.90", "CASH_ON_DELIVERY"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    h.flow.select_address(AddressId::new(3)).expect("select");
    h.flow
        .select_payment(PaymentMethod::CashOnDelivery)
        .expect("select");

    let (first, second) = tokio::join!(h.flow.submit(), h.flow.submit());
    assert!(first.is_ok());
    assert!(matches!(second, Err(CheckoutError::SubmitInFlight)));
}

#[tokio::test]
async fn stock_conflict_routes_back_to_the_cart() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(409).set_body_string("product 42 out of stock"))
        .mount(&h.server)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    h.flow.select_address(AddressId::new(3)).expect("select");
    h.flow
        .select_payment(PaymentMethod::CashOnDelivery)
        .expect("select");

    let err = h.flow.submit().await.expect_err("conflict must fail");
    assert!(matches!(err, CheckoutError::Api(_)));
    assert!(matches!(
        h.flow.stage(),
        CheckoutStage::Failed(CheckoutFailure::OutOfStock(_))
    ));
}

#[tokio::test]
async fn changed_cart_requires_reconfirmation_before_submit() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    // The mid-checkout edit grows the cart to two lines.
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(vec![
            cart_item_json(1, 42, 1, "19.90"),
            cart_item_json(2, 43, 1, "5.00"),
        ])))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(order_json(503, "24.90", "CASH_ON_DELIVERY")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    h.flow.select_address(AddressId::new(3)).expect("select");
    h.flow
        .select_payment(PaymentMethod::CashOnDelivery)
        .expect("select");

    // Shopper edits the cart in another tab.
    h.cart
        .add(ProductId::new(43), 1)
        .await
        .expect("cart edit should succeed");
    assert!(h.flow.cart_changed());

    let err = h.flow.submit().await.expect_err("divergence must block");
    assert!(matches!(err, CheckoutError::CartChanged));

    h.flow.refresh_snapshot().expect("re-confirmation");
    assert!(!h.flow.cart_changed());
    h.flow.submit().await.expect("submission should succeed");
}

#[tokio::test]
async fn submission_landing_after_sign_out_is_discarded() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(order_json(504, "19.90", "CASH_ON_DELIVERY"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&h.server)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    h.flow.select_address(AddressId::new(3)).expect("select");
    h.flow
        .select_payment(PaymentMethod::CashOnDelivery)
        .expect("select");

    let flow = h.flow.clone();
    let pending = tokio::spawn(async move { flow.submit().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The shopper logs out and back in while the submission is in flight,
    // and the next session reloads its cart before the response lands.
    h.identity.sign_out();
    h.identity.sign_in(test_user());
    h.cart
        .reload()
        .await
        .expect("next session's cart should load");

    let err = pending
        .await
        .expect("task should not panic")
        .expect_err("stale submission must be discarded");
    assert!(matches!(err, CheckoutError::NotSignedIn));

    // The stale response neither completed the dead attempt nor wiped the
    // cart the next session just reloaded.
    assert_eq!(h.flow.stage(), CheckoutStage::Idle);
    assert!(!h.cart.current().is_empty());
}

#[tokio::test]
async fn authorization_landing_after_sign_out_is_discarded() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/v1/card-authorizations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "auth_789" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&h.gateway)
        .await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");
    h.flow.select_address(AddressId::new(3)).expect("select");
    h.flow.select_payment(PaymentMethod::Card).expect("select");

    let flow = h.flow.clone();
    let pending = tokio::spawn(async move { flow.authorize(test_card()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.identity.sign_out();

    let err = pending
        .await
        .expect("task should not panic")
        .expect_err("stale authorization must be discarded");
    assert!(matches!(err, CheckoutError::NotSignedIn));
    assert_eq!(h.flow.stage(), CheckoutStage::Idle);
}

#[tokio::test]
async fn overlapping_begin_calls_load_the_address_book_once() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    Mock::given(method("GET"))
        .and(path("/users/7/addresses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([address_json(3, true)]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.cart.reload().await.expect("cart should load");

    let (first, second) = tokio::join!(h.flow.begin(), h.flow.begin());
    assert!(first.is_ok());
    assert!(matches!(second, Err(CheckoutError::WrongStage { .. })));
    assert_eq!(h.flow.stage(), CheckoutStage::SelectingAddress);
}

#[tokio::test]
async fn sign_out_mid_checkout_abandons_the_attempt() {
    let h = harness().await;
    mount_cart_with_one_item(&h.server).await;
    mount_default_address(&h.server).await;

    h.cart.reload().await.expect("cart should load");
    h.flow.begin().await.expect("begin should succeed");

    h.identity.sign_out();

    let err = h
        .flow
        .select_address(AddressId::new(3))
        .expect_err("stale attempt must fail");
    assert!(matches!(err, CheckoutError::NotSignedIn));
    assert_eq!(h.flow.stage(), CheckoutStage::Idle);
}
