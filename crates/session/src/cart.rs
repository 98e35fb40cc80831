//! Remote-backed cart store.
//!
//! Holds the authoritative client-side snapshot of the shopper's cart and
//! mediates every mutation through the catalog/order backend. The server is
//! the source of truth for resulting quantities and prices - a successful
//! response wholesale-replaces the snapshot, a failed one leaves it exactly
//! as it was.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use lunaria_api::{ApiError, CommerceClient, types::CartItem};
use lunaria_core::{CartItemId, Money, ProductId};

use crate::error::StoreError;
use crate::identity::AuthState;
use crate::inflight::InFlight;

/// Complete cart snapshot plus observer flags.
///
/// `total_items` and `total_price` are always recomputed from `items` by
/// [`CartState::from_items`]; no code path sets them independently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartState {
    /// Cart lines, unique by product.
    pub items: Vec<CartItem>,
    /// Sum of line quantities.
    pub total_items: u32,
    /// Sum of line totals.
    pub total_price: Money,
    /// Whether any cart action is currently in flight.
    pub busy: bool,
    /// Last failure, user-presentable. Cleared by the next success.
    pub error: Option<String>,
}

impl CartState {
    /// Build a snapshot from server-confirmed items, recomputing aggregates.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let total_items = items.iter().map(|i| i.quantity).sum();
        let total_price = items.iter().map(CartItem::line_total).sum();
        Self {
            items,
            total_items,
            total_price,
            busy: false,
            error: None,
        }
    }

    /// The explicit empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_items(Vec::new())
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Session-scoped cart store.
///
/// Cheap to clone; all clones share the same snapshot.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    client: CommerceClient,
    identity: watch::Receiver<AuthState>,
    state: watch::Sender<CartState>,
    inflight: InFlight,
}

impl CartStore {
    /// Create an empty cart store bound to the identity signal.
    #[must_use]
    pub fn new(client: CommerceClient, identity: watch::Receiver<AuthState>) -> Self {
        let (state, _) = watch::channel(CartState::empty());
        Self {
            inner: Arc::new(CartStoreInner {
                client,
                identity,
                state,
                inflight: InFlight::default(),
            }),
        }
    }

    /// Subscribe to snapshot broadcasts; the receiver immediately sees the
    /// latest snapshot, and dropping it unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Reset to the explicit empty cart without a network call.
    ///
    /// Used on sign-out so no observer can transiently render a previous
    /// shopper's data.
    pub fn reset(&self) {
        self.inner.state.send_replace(CartState::empty());
    }

    /// Re-fetch the full cart from the backend.
    ///
    /// On failure the snapshot is cleared to empty - never left at a stale
    /// previous success - and the error is recorded as recoverable.
    ///
    /// # Errors
    ///
    /// `StoreError::NotSignedIn` without a network call when anonymous;
    /// otherwise the classified API failure.
    pub async fn reload(&self) -> Result<(), StoreError> {
        let epoch = match &*self.inner.identity.borrow() {
            AuthState::SignedIn { epoch, .. } => *epoch,
            AuthState::Anonymous { .. } => {
                warn!("cart reload ignored: not signed in");
                return Err(StoreError::NotSignedIn);
            }
        };
        // Keyed by epoch so a stale in-flight reload cannot block the next
        // session's reload after a rapid logout-then-login.
        let Some(guard) = self.inner.inflight.try_begin(format!("reload:{epoch}")) else {
            return Err(StoreError::Busy("reload".into()));
        };
        self.inner.state.send_modify(|s| s.busy = true);

        let result = self.inner.client.get_cart().await;

        drop(guard);
        let still_busy = self.inner.inflight.any_active();

        if self.inner.identity.borrow().epoch() != epoch {
            debug!("discarding cart reload response from a previous identity epoch");
            self.inner.state.send_modify(|s| s.busy = still_busy);
            return Err(StoreError::Stale);
        }

        match result {
            Ok(items) => {
                let mut next = CartState::from_items(items);
                next.busy = still_busy;
                self.inner.state.send_replace(next);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "cart reload failed; falling back to empty");
                let mut empty = CartState::empty();
                empty.busy = still_busy;
                empty.error = Some(e.to_string());
                self.inner.state.send_replace(empty);
                Err(e.into())
            }
        }
    }

    /// Add a product line.
    ///
    /// Rejected without a network call when the quantity is zero or nobody
    /// is signed in.
    ///
    /// # Errors
    ///
    /// See [`StoreError`].
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> Result<(), StoreError> {
        if quantity == 0 {
            warn!(%product_id, "cart add ignored: quantity must be at least 1");
            return Err(StoreError::InvalidQuantity(quantity));
        }
        let client = self.inner.client.clone();
        self.mutate(format!("add:{product_id}"), move || async move {
            client.add_cart_item(product_id, quantity).await
        })
        .await
    }

    /// Change a line's quantity; zero delegates to [`CartStore::remove`].
    ///
    /// # Errors
    ///
    /// See [`StoreError`].
    pub async fn update_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        if quantity == 0 {
            return self.remove(item_id).await;
        }
        let client = self.inner.client.clone();
        self.mutate(format!("update:{item_id}"), move || async move {
            client.update_cart_item(item_id, quantity).await
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// See [`StoreError`].
    pub async fn remove(&self, item_id: CartItemId) -> Result<(), StoreError> {
        let client = self.inner.client.clone();
        self.mutate(format!("remove:{item_id}"), move || async move {
            client.remove_cart_item(item_id).await
        })
        .await
    }

    /// Delete every line.
    ///
    /// # Errors
    ///
    /// See [`StoreError`].
    pub async fn clear(&self) -> Result<(), StoreError> {
        let client = self.inner.client.clone();
        self.mutate("clear".to_string(), move || async move {
            client.clear_cart().await
        })
        .await
    }

    /// Shared mutation flow: single-flight per logical action, epoch-tagged,
    /// full-snapshot replacement on success, untouched snapshot on failure.
    async fn mutate<F, Fut>(&self, key: String, op: F) -> Result<(), StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CartItem>, ApiError>>,
    {
        let Some(guard) = self.inner.inflight.try_begin(key.clone()) else {
            debug!(action = %key, "cart action already in flight");
            return Err(StoreError::Busy(key));
        };
        let epoch = match &*self.inner.identity.borrow() {
            AuthState::SignedIn { epoch, .. } => *epoch,
            AuthState::Anonymous { .. } => {
                warn!(action = %key, "cart mutation ignored: not signed in");
                return Err(StoreError::NotSignedIn);
            }
        };
        self.inner.state.send_modify(|s| s.busy = true);

        let result = op().await;

        drop(guard);
        let still_busy = self.inner.inflight.any_active();

        if self.inner.identity.borrow().epoch() != epoch {
            debug!(action = %key, "discarding cart response from a previous identity epoch");
            self.inner.state.send_modify(|s| s.busy = still_busy);
            return Err(StoreError::Stale);
        }

        match result {
            Ok(items) => {
                let mut next = CartState::from_items(items);
                next.busy = still_busy;
                self.inner.state.send_replace(next);
                Ok(())
            }
            Err(e) => {
                warn!(action = %key, error = %e, "cart mutation failed; keeping prior snapshot");
                self.inner.state.send_modify(|s| {
                    s.busy = still_busy;
                    s.error = Some(e.to_string());
                });
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lunaria_api::types::ProductSummary;
    use lunaria_core::CurrencyCode;
    use rust_decimal::Decimal;

    fn item(id: i64, product_id: i64, quantity: u32, unit_cents: i64) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product: ProductSummary {
                id: ProductId::new(product_id),
                name: format!("Product {product_id}"),
                unit_price: Money::new(Decimal::new(unit_cents, 2), CurrencyCode::USD),
                image_url: None,
                rating: None,
            },
            quantity,
        }
    }

    #[test]
    fn test_aggregates_recomputed_from_items() {
        let state = CartState::from_items(vec![item(1, 10, 2, 5000), item(2, 11, 1, 1999)]);

        assert_eq!(state.total_items, 3);
        assert_eq!(state.total_price.amount, Decimal::new(11999, 2));
        assert!(state.error.is_none());
        assert!(!state.busy);
    }

    #[test]
    fn test_empty_cart_has_zero_aggregates() {
        let state = CartState::empty();
        assert!(state.is_empty());
        assert_eq!(state.total_items, 0);
        assert!(state.total_price.is_zero());
    }

    #[test]
    fn test_single_line_total() {
        // {productId: P1, quantity: 2, unitPrice: 50}
        let state = CartState::from_items(vec![item(1, 1, 2, 5000)]);
        assert_eq!(state.total_items, 2);
        assert_eq!(state.total_price.amount, Decimal::new(10000, 2));
    }
}
