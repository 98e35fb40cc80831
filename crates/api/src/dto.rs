//! Wire DTOs for the catalog/order API.
//!
//! The backend speaks camelCase JSON; everything in this module mirrors that
//! contract exactly and nothing outside `convert` should touch these shapes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lunaria_core::{CurrencyCode, OrderStatus, PaymentMethod};

/// Full cart representation, returned by every cart endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    pub items: Vec<CartItemDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub id: i64,
    pub quantity: u32,
    #[serde(flatten)]
    pub product: ProductSummaryDto,
}

/// Denormalized product fields embedded in cart/wishlist items.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryDto {
    pub product_id: i64,
    pub product_name: String,
    /// Decimal string on the wire (serde-with-str).
    pub unit_price: Decimal,
    pub currency: CurrencyCode,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
}

/// Full wishlist representation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistDto {
    pub items: Vec<WishlistItemDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemDto {
    #[serde(flatten)]
    pub product: ProductSummaryDto,
    pub added_at: Option<DateTime<Utc>>,
}

/// Standalone product summary from `GET /products/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub currency: CurrencyCode,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    pub id: i64,
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_billing: bool,
    #[serde(default)]
    pub is_shipping: bool,
}

/// Outbound payload for address create/update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddressDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_default: bool,
    pub is_billing: bool,
    pub is_shipping: bool,
}

/// Outbound payload for `POST /cart/items`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemDto {
    pub product_id: i64,
    pub quantity: u32,
}

/// Outbound payload for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderDto {
    pub shipping_address_id: i64,
    pub billing_address_id: i64,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_confirmation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItemDto>,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub shipping_address_id: i64,
    pub billing_address_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub currency: CurrencyCode,
    pub quantity: u32,
}
