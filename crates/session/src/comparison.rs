//! Bounded product comparison tray.
//!
//! Unlike the cart and wishlist this tray is device-scoped: it persists to a
//! local JSON file, works for anonymous shoppers, and survives sign-out. The
//! entry cap keeps side-by-side comparison views renderable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use lunaria_api::{CommerceClient, types::ProductSummary};
use lunaria_core::ProductId;

use crate::error::StoreError;

/// Maximum number of products that can be compared at once.
pub const MAX_COMPARE: usize = 4;

/// One product pinned for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub product: ProductSummary,
}

/// Comparison tray snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComparisonState {
    /// Pinned products in insertion order, at most [`MAX_COMPARE`].
    pub entries: Vec<ComparisonEntry>,
}

impl ComparisonState {
    /// Whether the given product is pinned.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.entries.iter().any(|e| e.product.id == product_id)
    }

    /// Whether the tray is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_COMPARE
    }
}

/// What happened to an add request. Every variant is a valid outcome the
/// caller can surface, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOutcome {
    /// The product was pinned.
    Added,
    /// The product was already pinned; the tray is unchanged.
    AlreadyPresent,
    /// The tray already holds [`MAX_COMPARE`] products.
    LimitReached,
    /// The catalog no longer knows this product.
    Unavailable,
}

/// Device-scoped comparison store backed by a JSON file.
///
/// Cheap to clone; all clones share the same snapshot and file.
#[derive(Clone)]
pub struct ComparisonStore {
    inner: Arc<ComparisonStoreInner>,
}

struct ComparisonStoreInner {
    client: CommerceClient,
    path: PathBuf,
    state: watch::Sender<ComparisonState>,
}

impl ComparisonStore {
    /// Load the tray from `path`, falling back to an empty tray when the
    /// file is missing or unreadable. A corrupt file is never fatal.
    #[must_use]
    pub fn load(client: CommerceClient, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        let (state, _) = watch::channel(ComparisonState { entries });
        Self {
            inner: Arc::new(ComparisonStoreInner {
                client,
                path,
                state,
            }),
        }
    }

    /// Subscribe to snapshot broadcasts; the receiver immediately sees the
    /// latest snapshot, and dropping it unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ComparisonState> {
        self.inner.state.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> ComparisonState {
        self.inner.state.borrow().clone()
    }

    /// Whether the given product is pinned.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    /// Pin a product for comparison.
    ///
    /// Duplicate and capacity checks run before any network traffic; the
    /// catalog is only consulted to resolve the product's display data.
    ///
    /// # Errors
    ///
    /// Only transport or server failures from the catalog lookup. Business
    /// outcomes (duplicate, full tray, vanished product) are reported in
    /// [`CompareOutcome`].
    pub async fn add(&self, product_id: ProductId) -> Result<CompareOutcome, StoreError> {
        {
            let state = self.inner.state.borrow();
            if state.contains(product_id) {
                return Ok(CompareOutcome::AlreadyPresent);
            }
            if state.is_full() {
                debug!(%product_id, "comparison tray full");
                return Ok(CompareOutcome::LimitReached);
            }
        }

        let Some(product) = self.inner.client.get_product(product_id).await? else {
            warn!(%product_id, "product not found; not adding to comparison");
            return Ok(CompareOutcome::Unavailable);
        };

        // Re-check after the await; a concurrent add may have raced us.
        let mut outcome = CompareOutcome::Added;
        self.inner.state.send_if_modified(|state| {
            if state.contains(product_id) {
                outcome = CompareOutcome::AlreadyPresent;
                return false;
            }
            if state.is_full() {
                outcome = CompareOutcome::LimitReached;
                return false;
            }
            state.entries.push(ComparisonEntry { product });
            true
        });
        if outcome == CompareOutcome::Added {
            self.persist();
        }
        Ok(outcome)
    }

    /// Unpin a product. Returns whether it was present.
    pub fn remove(&self, product_id: ProductId) -> bool {
        let removed = self.inner.state.send_if_modified(|state| {
            let before = state.entries.len();
            state.entries.retain(|e| e.product.id != product_id);
            state.entries.len() != before
        });
        if removed {
            self.persist();
        }
        removed
    }

    /// Empty the tray.
    pub fn clear(&self) {
        let cleared = self.inner.state.send_if_modified(|state| {
            if state.entries.is_empty() {
                return false;
            }
            state.entries.clear();
            true
        });
        if cleared {
            self.persist();
        }
    }

    /// Write the tray to disk. Persistence failures degrade the tray to
    /// in-memory only, they never fail the operation that triggered them.
    fn persist(&self) {
        let entries = self.inner.state.borrow().entries.clone();
        match serde_json::to_vec_pretty(&entries) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&self.inner.path, bytes) {
                    warn!(path = %self.inner.path.display(), error = %e, "failed to persist comparison tray");
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize comparison tray");
            }
        }
    }
}

fn read_entries(path: &Path) -> Vec<ComparisonEntry> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read comparison tray; starting empty");
            return Vec::new();
        }
    };
    match serde_json::from_slice::<Vec<ComparisonEntry>>(&bytes) {
        Ok(mut entries) => {
            entries.truncate(MAX_COMPARE);
            entries
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "comparison tray file is corrupt; starting empty");
            Vec::new()
        }
    }
}
