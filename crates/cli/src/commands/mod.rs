//! Command implementations and shared session wiring.

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::watch;

use lunaria_api::{ApiConfig, ApiError, CommerceClient, ConfigError, PaymentError};
use lunaria_core::UserId;
use lunaria_session::{
    AuthState, CartStore, CheckoutError, IdentityHandle, StoreError, UserInfo, WishlistStore,
};

pub mod cart;
pub mod checkout;
pub mod compare;
pub mod wishlist;

/// Errors surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Environment variable holds an unusable value.
    #[error("Invalid value for {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

/// One wired-up shopping session: client, identity and the stores bound to
/// it.
pub struct SessionContext {
    pub config: ApiConfig,
    pub client: CommerceClient,
    pub identity: IdentityHandle,
    pub identity_rx: watch::Receiver<AuthState>,
    pub cart: CartStore,
    pub wishlist: WishlistStore,
}

impl SessionContext {
    /// Build the session and sign in the shopper described by
    /// `COMMERCE_USER_ID` / `COMMERCE_USER_EMAIL`.
    ///
    /// # Errors
    ///
    /// Configuration or environment problems.
    pub fn signed_in() -> Result<Self, CliError> {
        let ctx = Self::anonymous()?;
        let user = user_from_env()?;
        ctx.identity.sign_in(user);
        Ok(ctx)
    }

    /// Build the session without signing anyone in. Enough for catalog
    /// lookups and the local comparison tray.
    ///
    /// # Errors
    ///
    /// Configuration problems.
    pub fn anonymous() -> Result<Self, CliError> {
        let config = ApiConfig::from_env()?;
        let token = std::env::var("COMMERCE_BEARER_TOKEN")
            .ok()
            .map(SecretString::from);
        let client = CommerceClient::new(&config, Arc::new(token))?;

        let (identity, identity_rx) = IdentityHandle::new();
        let cart = CartStore::new(client.clone(), identity_rx.clone());
        let wishlist = WishlistStore::new(client.clone(), identity_rx.clone());

        Ok(Self {
            config,
            client,
            identity,
            identity_rx,
            cart,
            wishlist,
        })
    }
}

fn user_from_env() -> Result<UserInfo, CliError> {
    let id = std::env::var("COMMERCE_USER_ID")
        .map_err(|_| CliError::MissingEnvVar("COMMERCE_USER_ID"))?;
    let id: i64 = id
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            CliError::InvalidEnvVar("COMMERCE_USER_ID", e.to_string())
        })?;
    let email = std::env::var("COMMERCE_USER_EMAIL")
        .map_err(|_| CliError::MissingEnvVar("COMMERCE_USER_EMAIL"))?;
    Ok(UserInfo {
        id: UserId::new(id),
        email,
    })
}
