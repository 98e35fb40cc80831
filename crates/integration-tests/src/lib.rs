//! Shared fixtures for Lunaria integration tests.
//!
//! Every test talks to a `wiremock::MockServer` standing in for the
//! catalog/order backend (and, for checkout, a second one standing in for
//! the payment gateway). The helpers here build clients pointed at a mock
//! server plus the camelCase JSON bodies the backend speaks.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::watch;
use url::Url;

use lunaria_api::{CommerceClient, PaymentClient};
use lunaria_core::UserId;
use lunaria_session::{AuthState, IdentityHandle, UserInfo};

/// Commerce client pointed at a mock server, carrying a bearer token.
#[must_use]
pub fn commerce_client(server_uri: &str) -> CommerceClient {
    let url = Url::parse(server_uri).expect("mock server URI should parse");
    let token = Some(SecretString::from("test-token"));
    CommerceClient::with_base_url(url, 5, Arc::new(token))
        .expect("client construction should not fail")
}

/// Payment client pointed at a mock gateway.
#[must_use]
pub fn payment_client(server_uri: &str) -> PaymentClient {
    let url = Url::parse(server_uri).expect("mock server URI should parse");
    let key = SecretString::from("sk_test_4242424242424242424242424242424242");
    PaymentClient::with_base_url(url, &key).expect("client construction should not fail")
}

/// The shopper every test signs in as.
#[must_use]
pub fn test_user() -> UserInfo {
    UserInfo {
        id: UserId::new(7),
        email: "shopper@example.com".to_string(),
    }
}

/// An identity channel already signed in as [`test_user`].
#[must_use]
pub fn signed_in_identity() -> (IdentityHandle, watch::Receiver<AuthState>) {
    let (handle, rx) = IdentityHandle::new();
    handle.sign_in(test_user());
    (handle, rx)
}

/// One cart line as the backend serializes it.
#[must_use]
pub fn cart_item_json(id: i64, product_id: i64, quantity: u32, unit_price: &str) -> Value {
    json!({
        "id": id,
        "quantity": quantity,
        "productId": product_id,
        "productName": format!("Product {product_id}"),
        "unitPrice": unit_price,
        "currency": "USD",
        "imageUrl": null,
        "rating": 4.5,
    })
}

/// A full cart body.
#[must_use]
pub fn cart_json(items: Vec<Value>) -> Value {
    json!({ "items": items })
}

/// One wishlist entry as the backend serializes it.
#[must_use]
pub fn wishlist_item_json(product_id: i64, unit_price: &str) -> Value {
    json!({
        "productId": product_id,
        "productName": format!("Product {product_id}"),
        "unitPrice": unit_price,
        "currency": "USD",
        "imageUrl": null,
        "rating": null,
        "addedAt": "2026-08-01T10:00:00Z",
    })
}

/// A full wishlist body.
#[must_use]
pub fn wishlist_json(items: Vec<Value>) -> Value {
    json!({ "items": items })
}

/// A standalone product body from `GET /products/{id}`.
#[must_use]
pub fn product_json(id: i64, unit_price: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "unitPrice": unit_price,
        "currency": "USD",
        "imageUrl": format!("https://cdn.example.com/p/{id}.jpg"),
        "rating": 4.0,
    })
}

/// A saved address body.
#[must_use]
pub fn address_json(id: i64, is_default: bool) -> Value {
    json!({
        "id": id,
        "title": "Ms",
        "firstName": "Ada",
        "lastName": "Byron",
        "street": "12 Analytical Way",
        "city": "London",
        "state": "LDN",
        "postalCode": "N1 9GU",
        "country": "GB",
        "phone": null,
        "isDefault": is_default,
        "isBilling": true,
        "isShipping": true,
    })
}

/// A confirmed order body.
#[must_use]
pub fn order_json(id: i64, total: &str, payment_method: &str) -> Value {
    json!({
        "id": id,
        "userId": 7,
        "status": "PENDING",
        "paymentMethod": payment_method,
        "items": [
            {
                "productId": 42,
                "name": "Product 42",
                "unitPrice": total,
                "currency": "USD",
                "quantity": 1,
            }
        ],
        "total": total,
        "currency": "USD",
        "shippingAddressId": 3,
        "billingAddressId": 3,
        "createdAt": "2026-08-02T09:30:00Z",
    })
}
