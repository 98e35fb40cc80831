//! Lunaria API - remote collaborators for the commerce session layer.
//!
//! # Architecture
//!
//! - The catalog/order backend is the source of truth - every mutation
//!   returns the full resulting collection, never a delta
//! - Wire DTOs (`dto`) are mapped into domain types (`types`) at the
//!   boundary by `convert`, so server field naming never leaks inward
//! - Product summaries are cached in-memory via `moka` (5 minute TTL)
//!
//! # Clients
//!
//! ## [`CommerceClient`]
//! - Cart, wishlist, address, order, and product endpoints
//! - Bearer credentials come from a [`TokenSource`] owned by the caller;
//!   the client never stores or refreshes a token itself
//!
//! ## [`PaymentClient`]
//! - Card authorization against the external payment gateway
//! - Returns an opaque authorization handle, or a structured decline
//!
//! # Example
//!
//! ```rust,ignore
//! use lunaria_api::{ApiConfig, CommerceClient};
//!
//! let config = ApiConfig::from_env()?;
//! let client = CommerceClient::new(&config, tokens);
//!
//! let cart = client.get_cart().await?;
//! let cart = client.add_cart_item(ProductId::new(42), 2).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod client;
mod convert;
mod dto;

pub mod config;
pub mod error;
pub mod payment;
pub mod types;

pub use client::{CommerceClient, StaticToken, TokenSource};
pub use config::{ApiConfig, ConfigError, PaymentConfig};
pub use error::ApiError;
pub use payment::{CardDetails, PaymentAuthorization, PaymentClient, PaymentError};
