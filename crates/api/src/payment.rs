//! Card payment gateway client.
//!
//! Authorizes a card for the checkout total and returns an opaque
//! authorization handle that the order API accepts as
//! `paymentConfirmationId`. Card-level declines are structured errors,
//! disjoint from order-creation failures, so checkout can let the shopper
//! retry card entry without losing address or method selection.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use lunaria_core::Money;

use crate::config::PaymentConfig;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The card was declined. Resumable - the shopper may retry with
    /// different card details.
    #[error("card declined ({code}): {message}")]
    Declined { code: String, message: String },

    /// The gateway itself failed.
    #[error("gateway error: {status} - {message}")]
    Gateway { status: u16, message: String },

    /// Failed to parse a gateway response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Card details entered by the shopper.
///
/// Implements `Debug` manually; the PAN and CVC never appear in logs.
#[derive(Clone)]
pub struct CardDetails {
    /// Name on the card.
    pub cardholder_name: String,
    /// Primary account number.
    pub number: SecretString,
    /// Expiry month (1-12).
    pub exp_month: u8,
    /// Four-digit expiry year.
    pub exp_year: u16,
    /// Card verification code.
    pub cvc: SecretString,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("cardholder_name", &self.cardholder_name)
            .field("number", &"[REDACTED]")
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"[REDACTED]")
            .finish()
    }
}

/// A validated, not-yet-settled payment instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAuthorization {
    /// Opaque handle, passed to order creation as the payment confirmation.
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeRequest<'a> {
    cardholder_name: &'a str,
    number: &'a str,
    exp_month: u8,
    exp_year: u16,
    cvc: &'a str,
    amount: rust_decimal::Decimal,
    currency: &'static str,
}

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DeclineResponse {
    error: DeclineBody,
}

#[derive(Debug, Deserialize)]
struct DeclineBody {
    code: String,
    message: String,
}

/// Client for the external card payment gateway.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    base_url: Url,
}

impl PaymentClient {
    /// Create a new payment gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the secret key
    /// is not a valid header value.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        Self::with_base_url(config.gateway_url.clone(), &config.secret_key)
    }

    /// Create a client with an explicit gateway URL (for tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the secret key
    /// is not a valid header value.
    pub fn with_base_url(base_url: Url, secret_key: &SecretString) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", secret_key.expose_secret());
        let mut auth_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("invalid secret key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert("Authorization", auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Authorize a card for the given amount.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::Declined`] for a card-level rejection (402 with a
    ///   structured error body)
    /// - [`PaymentError::Gateway`] for any other non-success response
    /// - [`PaymentError::Http`] on transport failure
    #[instrument(skip(self, card), fields(amount = %amount))]
    pub async fn authorize(
        &self,
        card: &CardDetails,
        amount: Money,
    ) -> Result<PaymentAuthorization, PaymentError> {
        let url = self
            .base_url
            .join("v1/card-authorizations")
            .map_err(|e| PaymentError::Parse(format!("invalid gateway URL: {e}")))?;

        let body = AuthorizeRequest {
            cardholder_name: &card.cardholder_name,
            number: card.number.expose_secret(),
            exp_month: card.exp_month,
            exp_year: card.exp_year,
            cvc: card.cvc.expose_secret(),
            amount: amount.amount,
            currency: amount.currency_code.code(),
        };

        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::PAYMENT_REQUIRED {
            let text = response.text().await.unwrap_or_default();
            let decline: DeclineResponse = serde_json::from_str(&text)
                .map_err(|e| PaymentError::Parse(format!("malformed decline body: {e}")))?;
            return Err(PaymentError::Declined {
                code: decline.error.code,
                message: decline.error.message,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let authorized: AuthorizeResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        Ok(PaymentAuthorization { id: authorized.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_details_debug_redacts_pan_and_cvc() {
        let card = CardDetails {
            cardholder_name: "Ada Byron".to_string(),
            number: SecretString::from("4242424242424242"),
            exp_month: 12,
            exp_year: 2030,
            cvc: SecretString::from("123"),
        };
        let rendered = format!("{card:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("4242"));
        assert!(!rendered.contains("123"));
    }

    #[test]
    fn test_payment_error_display() {
        let err = PaymentError::Declined {
            code: "insufficient_funds".to_string(),
            message: "Your card has insufficient funds.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "card declined (insufficient_funds): Your card has insufficient funds."
        );
    }
}
