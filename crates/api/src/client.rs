//! Catalog/order API client.
//!
//! Plain REST with `reqwest` and JSON bodies. Every cart/wishlist mutation
//! returns the full resulting collection from the backend - callers treat
//! the response as a snapshot replacement, never a delta to merge.
//! Product summaries are cached with `moka` (5-minute TTL).

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use lunaria_core::{AddressId, CartItemId, ProductId, UserId};

use crate::config::ApiConfig;
use crate::convert::{
    convert_address, convert_cart, convert_order, convert_product, convert_wishlist,
};
use crate::dto::{
    AddCartItemDto, AddressDto, CartDto, CreateOrderDto, NewAddressDto, OrderDto, ProductDto,
    WishlistDto,
};
use crate::error::ApiError;
use crate::types::{Address, CartItem, NewAddress, Order, OrderRequest, ProductSummary, WishlistItem};

/// Product cache TTL.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Supplies the bearer credential for authenticated requests.
///
/// The identity/session provider owns credential issuing and refresh; this
/// client only asks for the current token per request and attaches it. `None`
/// means the request goes out unauthenticated (the backend answers 401 where
/// that matters).
pub trait TokenSource: Send + Sync {
    /// Current bearer credential, if any.
    fn bearer_token(&self) -> Option<SecretString>;
}

/// Fixed-token source, mainly for the CLI and tests.
pub struct StaticToken(pub SecretString);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

impl TokenSource for Option<SecretString> {
    fn bearer_token(&self) -> Option<SecretString> {
        self.clone()
    }
}

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the catalog/order backend.
///
/// Cheap to clone; all clones share one connection pool and product cache.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
    product_cache: Cache<ProductId, ProductSummary>,
}

impl CommerceClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        Self::with_base_url(config.base_url.clone(), config.timeout_secs, tokens)
    }

    /// Create a client with an explicit base URL (for pointing at a mock
    /// server in tests).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        base_url: Url,
        timeout_secs: u64,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("lunaria/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Normalise: a trailing slash makes Url::join append path segments
        // instead of replacing the last one.
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url,
                tokens,
                product_cache,
            }),
        })
    }

    /// Build an absolute URL for an API path.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Api {
                status: 0,
                message: format!("invalid path {path}: {e}"),
            })
    }

    /// Send a request, attaching the bearer credential from the
    /// [`TokenSource`] when present, and classify non-success statuses
    /// exactly once.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        idempotency_key: Option<Uuid>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path)?;
        let mut request = self.inner.client.request(method, url);

        if let Some(token) = self.inner.tokens.bearer_token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key.to_string());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, body, retry_after));
        }

        Ok(response)
    }

    /// Execute a request and decode the JSON response.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        idempotency_key: Option<Uuid>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, body, idempotency_key).await?;

        // Decode from text so a shape mismatch can log the offending body.
        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path,
                    body = %text.chars().take(500).collect::<String>(),
                    "failed to parse API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the full cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is not
    /// authenticated.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Vec<CartItem>, ApiError> {
        let dto: CartDto = self.execute(Method::GET, "/cart", None, None).await?;
        Ok(convert_cart(dto))
    }

    /// Add a product line to the cart; returns the full resulting cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn add_cart_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, ApiError> {
        let body = serde_json::to_value(AddCartItemDto {
            product_id: product_id.as_i64(),
            quantity,
        })?;
        let dto: CartDto = self
            .execute(Method::POST, "/cart/items", Some(body), None)
            .await?;
        Ok(convert_cart(dto))
    }

    /// Update a cart line's quantity; returns the full resulting cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the line no longer exists.
    #[instrument(skip(self), fields(item_id = %item_id, quantity))]
    pub async fn update_cart_item(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, ApiError> {
        let path = format!("/cart/items/{item_id}?quantity={quantity}");
        let dto: CartDto = self.execute(Method::PUT, &path, None, None).await?;
        Ok(convert_cart(dto))
    }

    /// Remove a cart line; returns the full resulting cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_cart_item(&self, item_id: CartItemId) -> Result<Vec<CartItem>, ApiError> {
        let path = format!("/cart/items/{item_id}");
        let dto: CartDto = self.execute(Method::DELETE, &path, None, None).await?;
        Ok(convert_cart(dto))
    }

    /// Delete every cart line; returns the (empty) resulting cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Vec<CartItem>, ApiError> {
        let dto: CartDto = self.execute(Method::DELETE, "/cart", None, None).await?;
        Ok(convert_cart(dto))
    }

    // =========================================================================
    // Wishlist Methods
    // =========================================================================

    /// Fetch the full wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Result<Vec<WishlistItem>, ApiError> {
        let dto: WishlistDto = self.execute(Method::GET, "/wishlist", None, None).await?;
        Ok(convert_wishlist(dto))
    }

    /// Add a product to the wishlist; returns the full resulting wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_wishlist_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<WishlistItem>, ApiError> {
        let path = format!("/wishlist/products/{product_id}");
        let dto: WishlistDto = self.execute(Method::POST, &path, None, None).await?;
        Ok(convert_wishlist(dto))
    }

    /// Remove a product from the wishlist; returns the full resulting
    /// wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_wishlist_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<WishlistItem>, ApiError> {
        let path = format!("/wishlist/products/{product_id}");
        let dto: WishlistDto = self.execute(Method::DELETE, &path, None, None).await?;
        Ok(convert_wishlist(dto))
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Fetch a product summary, from cache when possible.
    ///
    /// A deleted product (404) comes back as `Ok(None)` - callers treat
    /// absence as an ordinary outcome, not a failure.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than 404.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductSummary>, ApiError> {
        if let Some(product) = self.inner.product_cache.get(&product_id).await {
            debug!("cache hit for product");
            return Ok(Some(product));
        }

        let path = format!("/products/{product_id}");
        let dto: ProductDto = match self.execute(Method::GET, &path, None, None).await {
            Ok(dto) => dto,
            Err(ApiError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let product = convert_product(dto);
        self.inner
            .product_cache
            .insert(product_id, product.clone())
            .await;

        Ok(Some(product))
    }

    /// Invalidate all cached product summaries.
    pub async fn invalidate_products(&self) {
        self.inner.product_cache.invalidate_all();
        self.inner.product_cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Address Methods
    // =========================================================================

    /// List the user's saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_addresses(&self, user_id: UserId) -> Result<Vec<Address>, ApiError> {
        let path = format!("/users/{user_id}/addresses");
        let dtos: Vec<AddressDto> = self.execute(Method::GET, &path, None, None).await?;
        Ok(dtos.into_iter().map(convert_address).collect())
    }

    /// Create a new address for the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, address), fields(user_id = %user_id))]
    pub async fn create_address(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, ApiError> {
        let path = format!("/users/{user_id}/addresses");
        let body = serde_json::to_value(new_address_dto(address))?;
        let dto: AddressDto = self.execute(Method::POST, &path, Some(body), None).await?;
        Ok(convert_address(dto))
    }

    /// Update an existing address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the address no longer exists.
    #[instrument(skip(self, address), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn update_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
        address: &NewAddress,
    ) -> Result<Address, ApiError> {
        let path = format!("/users/{user_id}/addresses/{address_id}");
        let body = serde_json::to_value(new_address_dto(address))?;
        let dto: AddressDto = self.execute(Method::PUT, &path, Some(body), None).await?;
        Ok(convert_address(dto))
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn delete_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<(), ApiError> {
        let path = format!("/users/{user_id}/addresses/{address_id}");
        self.send(Method::DELETE, &path, None, None).await?;
        Ok(())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Create an order from the server-side cart.
    ///
    /// The `idempotency_key` is fixed per checkout attempt; the backend must
    /// treat a replayed key as the same order, so a retried submission after
    /// a transient failure cannot duplicate.
    ///
    /// # Errors
    ///
    /// `ApiError::Conflict` signals a stock conflict; other variants follow
    /// the usual taxonomy.
    #[instrument(skip(self, request), fields(idempotency_key = %idempotency_key))]
    pub async fn create_order(
        &self,
        request: &OrderRequest,
        idempotency_key: Uuid,
    ) -> Result<Order, ApiError> {
        let body = serde_json::to_value(CreateOrderDto {
            shipping_address_id: request.shipping_address_id.as_i64(),
            billing_address_id: request.billing_address_id.as_i64(),
            payment_method: request.payment_method,
            payment_confirmation_id: request.payment_confirmation_id.clone(),
        })?;
        let dto: OrderDto = self
            .execute(Method::POST, "/orders", Some(body), Some(idempotency_key))
            .await?;
        Ok(convert_order(dto))
    }
}

fn new_address_dto(address: &NewAddress) -> NewAddressDto {
    NewAddressDto {
        title: address.title.clone(),
        first_name: address.first_name.clone(),
        last_name: address.last_name.clone(),
        street: address.street.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        postal_code: address.postal_code.clone(),
        country: address.country.clone(),
        phone: address.phone.clone(),
        is_default: address.is_default,
        is_billing: address.is_billing,
        is_shipping: address.is_shipping,
    }
}
