//! Closed status enumerations.
//!
//! The remote API speaks SCREAMING_SNAKE_CASE strings for these; keeping them
//! as closed enums means an unknown value fails at the deserialization
//! boundary instead of falling through a string match somewhere deep in the
//! session layer.

use serde::{Deserialize, Serialize};

/// How an order is paid.
///
/// Only `Card` routes through the external payment-authorization step;
/// the other methods create a pending-payment order directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
    BankTransfer,
}

impl PaymentMethod {
    /// Whether this method requires an authorization handle before order
    /// creation.
    #[must_use]
    pub const fn requires_authorization(self) -> bool {
        matches!(self, Self::Card)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::CashOnDelivery => write!(f, "cash on delivery"),
            Self::BankTransfer => write!(f, "bank transfer"),
        }
    }
}

/// Server-side order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether the order has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}
