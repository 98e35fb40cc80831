//! Error types for the session layer.
//!
//! Store and checkout failures are classified so the presentation layer can
//! pick the right next step (retry, redirect to cart, re-authenticate)
//! without inspecting status codes. Nothing here ever panics the process.

use thiserror::Error;

use lunaria_api::{ApiError, PaymentError};

/// Errors from the reactive stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Mutation attempted without a signed-in shopper. No network call was
    /// made.
    #[error("not signed in")]
    NotSignedIn,

    /// Quantity must be at least 1.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The same logical action is already in flight.
    #[error("action already in flight: {0}")]
    Busy(String),

    /// The response belonged to a previous identity epoch and was discarded.
    #[error("response discarded: identity changed while the request was in flight")]
    Stale,

    /// The remote call failed; the snapshot was not corrupted.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl StoreError {
    /// Whether retrying the same operation may succeed as-is.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_recoverable(),
            Self::Busy(_) | Self::Stale => true,
            Self::NotSignedIn | Self::InvalidQuantity(_) => false,
        }
    }
}

/// Errors from the checkout state machine.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout cannot begin with an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Checkout requires a signed-in shopper.
    #[error("not signed in")]
    NotSignedIn,

    /// The operation is not valid in the current stage.
    #[error("invalid checkout stage for {operation}")]
    WrongStage { operation: &'static str },

    /// The selected address is not one of the shopper's saved addresses.
    #[error("unknown address: {0}")]
    UnknownAddress(lunaria_core::AddressId),

    /// Submission requires a selected address.
    #[error("no address selected")]
    NoAddressSelected,

    /// Submission requires a selected payment method.
    #[error("no payment method selected")]
    NoPaymentMethodSelected,

    /// The card method requires a successful authorization before submit.
    #[error("payment not authorized yet")]
    AuthorizationMissing,

    /// The live cart diverged from the frozen snapshot; the shopper must
    /// explicitly re-confirm via `refresh_snapshot`.
    #[error("cart changed since checkout began; re-confirmation required")]
    CartChanged,

    /// A submission is already in flight.
    #[error("order submission already in flight")]
    SubmitInFlight,

    /// The payment gateway rejected or failed the authorization.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The order API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}
