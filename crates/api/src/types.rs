//! Domain types for the catalog/order API.
//!
//! These are the shapes the session layer works with. They are deliberately
//! separate from the wire DTOs in `dto` - server field naming and versioning
//! stay at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lunaria_core::{
    AddressId, CartItemId, Money, OrderId, OrderStatus, PaymentMethod, ProductId, UserId,
};

// =============================================================================
// Product Types
// =============================================================================

/// Denormalized product summary, captured at load time.
///
/// Collection items carry one of these rather than a live product reference;
/// a later price change on the server does not retroactively alter what a
/// snapshot displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price at load time.
    pub unit_price: Money,
    /// Primary image URL.
    pub image_url: Option<String>,
    /// Average review rating (e.g., 4.5), if the product has reviews.
    pub rating: Option<f64>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Server-assigned line ID.
    pub id: CartItemId,
    /// Denormalized product summary.
    pub product: ProductSummary,
    /// Quantity, always >= 1 in a server-confirmed cart.
    pub quantity: u32,
}

impl CartItem {
    /// Line total: `quantity x unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.unit_price * self.quantity
    }
}

// =============================================================================
// Wishlist Types
// =============================================================================

/// An entry in the wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Denormalized product summary.
    pub product: ProductSummary,
    /// When the product was wished for.
    pub added_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Address Types
// =============================================================================

/// A saved shipping/billing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Address ID.
    pub id: AddressId,
    /// Salutation (e.g., "Ms").
    pub title: Option<String>,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Street and house number.
    pub street: String,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// Country.
    pub country: String,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Preselected address for checkout. At most one per user - enforced by
    /// the backend, only read here.
    pub is_default: bool,
    /// Usable as billing address.
    pub is_billing: bool,
    /// Usable as shipping address.
    pub is_shipping: bool,
}

/// Payload for creating or updating an address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAddress {
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
    pub is_billing: bool,
    pub is_shipping: bool,
}

// =============================================================================
// Order Types
// =============================================================================

/// A line in a confirmed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product reference.
    pub product_id: ProductId,
    /// Product name at order time.
    pub name: String,
    /// Unit price at order time.
    pub unit_price: Money,
    /// Quantity ordered.
    pub quantity: u32,
}

/// A server-confirmed, immutable order.
///
/// Never constructed client-side except as deserialized from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Ordering user.
    pub user_id: UserId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// How the order is paid.
    pub payment_method: PaymentMethod,
    /// Order lines.
    pub items: Vec<OrderItem>,
    /// Total charged.
    pub total: Money,
    /// Shipping address used.
    pub shipping_address_id: AddressId,
    /// Billing address used.
    pub billing_address_id: AddressId,
    /// When the backend created the order.
    pub created_at: DateTime<Utc>,
}

/// Request payload for order creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Shipping address.
    pub shipping_address_id: AddressId,
    /// Billing address.
    pub billing_address_id: AddressId,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Authorization handle from the payment gateway. Present only for
    /// methods that require authorization.
    pub payment_confirmation_id: Option<String>,
}
