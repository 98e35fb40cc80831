//! Remote-backed wishlist store.
//!
//! Same discipline as the cart: the backend confirms every mutation by
//! returning the full collection, and that response replaces the snapshot.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use lunaria_api::{ApiError, CommerceClient, types::WishlistItem};
use lunaria_core::ProductId;

use crate::error::StoreError;
use crate::identity::AuthState;
use crate::inflight::InFlight;

/// Wishlist snapshot plus observer flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WishlistState {
    /// Saved products, unique by product.
    pub items: Vec<WishlistItem>,
    /// Whether any wishlist action is currently in flight.
    pub busy: bool,
    /// Last failure, user-presentable. Cleared by the next success.
    pub error: Option<String>,
}

impl WishlistState {
    fn from_items(items: Vec<WishlistItem>) -> Self {
        Self {
            items,
            busy: false,
            error: None,
        }
    }

    /// Whether the given product is saved.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|i| i.product.id == product_id)
    }
}

/// Session-scoped wishlist store.
///
/// Cheap to clone; all clones share the same snapshot.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistStoreInner>,
}

struct WishlistStoreInner {
    client: CommerceClient,
    identity: watch::Receiver<AuthState>,
    state: watch::Sender<WishlistState>,
    inflight: InFlight,
}

impl WishlistStore {
    /// Create an empty wishlist store bound to the identity signal.
    #[must_use]
    pub fn new(client: CommerceClient, identity: watch::Receiver<AuthState>) -> Self {
        let (state, _) = watch::channel(WishlistState::default());
        Self {
            inner: Arc::new(WishlistStoreInner {
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
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.inner.state.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> WishlistState {
        self.inner.state.borrow().clone()
    }

    /// Whether the given product is in the current snapshot. Answers from
    /// local state only, no network call.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    /// Reset to the empty wishlist without a network call.
    pub fn reset(&self) {
        self.inner.state.send_replace(WishlistState::default());
    }

    /// Re-fetch the full wishlist from the backend.
    ///
    /// On failure the snapshot is cleared to empty and the error recorded.
    ///
    /// # Errors
    ///
    /// `StoreError::NotSignedIn` without a network call when anonymous;
    /// otherwise the classified API failure.
    pub async fn reload(&self) -> Result<(), StoreError> {
        let epoch = match &*self.inner.identity.borrow() {
            AuthState::SignedIn { epoch, .. } => *epoch,
            AuthState::Anonymous { .. } => {
                warn!("wishlist reload ignored: not signed in");
                return Err(StoreError::NotSignedIn);
            }
        };
        // Keyed by epoch so a stale in-flight reload cannot block the next
        // session's reload after a rapid logout-then-login.
        let Some(guard) = self.inner.inflight.try_begin(format!("reload:{epoch}")) else {
            return Err(StoreError::Busy("reload".into()));
        };
        self.inner.state.send_modify(|s| s.busy = true);

        let result = self.inner.client.get_wishlist().await;

        drop(guard);
        let still_busy = self.inner.inflight.any_active();

        if self.inner.identity.borrow().epoch() != epoch {
            debug!("discarding wishlist reload response from a previous identity epoch");
            self.inner.state.send_modify(|s| s.busy = still_busy);
            return Err(StoreError::Stale);
        }

        match result {
            Ok(items) => {
                let mut next = WishlistState::from_items(items);
                next.busy = still_busy;
                self.inner.state.send_replace(next);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "wishlist reload failed; falling back to empty");
                let mut empty = WishlistState::default();
                empty.busy = still_busy;
                empty.error = Some(e.to_string());
                self.inner.state.send_replace(empty);
                Err(e.into())
            }
        }
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// See [`StoreError`].
    pub async fn add(&self, product_id: ProductId) -> Result<(), StoreError> {
        let client = self.inner.client.clone();
        self.mutate(format!("add:{product_id}"), move || async move {
            client.add_wishlist_product(product_id).await
        })
        .await
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// See [`StoreError`].
    pub async fn remove(&self, product_id: ProductId) -> Result<(), StoreError> {
        let client = self.inner.client.clone();
        self.mutate(format!("remove:{product_id}"), move || async move {
            client.remove_wishlist_product(product_id).await
        })
        .await
    }

    async fn mutate<F, Fut>(&self, key: String, op: F) -> Result<(), StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<WishlistItem>, ApiError>>,
    {
        let Some(guard) = self.inner.inflight.try_begin(key.clone()) else {
            debug!(action = %key, "wishlist action already in flight");
            return Err(StoreError::Busy(key));
        };
        let epoch = match &*self.inner.identity.borrow() {
            AuthState::SignedIn { epoch, .. } => *epoch,
            AuthState::Anonymous { .. } => {
                warn!(action = %key, "wishlist mutation ignored: not signed in");
                return Err(StoreError::NotSignedIn);
            }
        };
        self.inner.state.send_modify(|s| s.busy = true);

        let result = op().await;

        drop(guard);
        let still_busy = self.inner.inflight.any_active();

        if self.inner.identity.borrow().epoch() != epoch {
            debug!(action = %key, "discarding wishlist response from a previous identity epoch");
            self.inner.state.send_modify(|s| s.busy = still_busy);
            return Err(StoreError::Stale);
        }

        match result {
            Ok(items) => {
                let mut next = WishlistState::from_items(items);
                next.busy = still_busy;
                self.inner.state.send_replace(next);
                Ok(())
            }
            Err(e) => {
                warn!(action = %key, error = %e, "wishlist mutation failed; keeping prior snapshot");
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
    use lunaria_core::{CurrencyCode, Money};
    use rust_decimal::Decimal;

    fn saved(product_id: i64) -> WishlistItem {
        WishlistItem {
            product: ProductSummary {
                id: ProductId::new(product_id),
                name: format!("Product {product_id}"),
                unit_price: Money::new(Decimal::new(999, 2), CurrencyCode::USD),
                image_url: None,
                rating: None,
            },
            added_at: None,
        }
    }

    #[test]
    fn test_contains_checks_product_id() {
        let state = WishlistState::from_items(vec![saved(7), saved(9)]);
        assert!(state.contains(ProductId::new(7)));
        assert!(!state.contains(ProductId::new(8)));
    }
}
