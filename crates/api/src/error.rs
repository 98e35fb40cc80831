//! Error taxonomy for the remote catalog/order API.
//!
//! Status-code classification happens exactly once, here. Everything above
//! this crate works in terms of [`ApiError`] variants, never raw status
//! codes.

use thiserror::Error;

/// Errors that can occur when talking to the catalog/order backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure - no response at all. Always retryable.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401 - the bearer credential is missing or stale. Not retryable
    /// without re-authentication.
    #[error("authentication required")]
    AuthRequired,

    /// 403 - authenticated but not allowed. Not retried.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 404 - entity no longer exists. Call sites that tolerate absence map
    /// this to `None` instead of propagating.
    #[error("not found: {0}")]
    NotFound(String),

    /// 409 - e.g. insufficient stock at order creation. Distinguished from
    /// generic server failure so checkout can route back to the cart.
    #[error("conflict: {0}")]
    Conflict(String),

    /// 429 - backend asked us to slow down.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether retrying the same request may succeed without any other
    /// change (re-authentication, cart edit, ...). Only server-side
    /// failures count; a 4xx rejection will fail the same way again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited(_) | Self::Api { status: 500.., .. }
        )
    }

    /// Classify a non-success HTTP status plus response body.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, body: String, retry_after: Option<u64>) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => Self::AuthRequired,
            reqwest::StatusCode::FORBIDDEN => Self::Forbidden(body),
            reqwest::StatusCode::NOT_FOUND => Self::NotFound(body),
            reqwest::StatusCode::CONFLICT => Self::Conflict(body),
            reqwest::StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(retry_after.unwrap_or(1)),
            _ => Self::Api {
                status: status.as_u16(),
                message: body,
            },
        }
    }
}
