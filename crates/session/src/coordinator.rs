//! Identity-to-store coordination.
//!
//! A single background task watches the identity signal and keeps the
//! session-scoped stores consistent with it: sign-in triggers a reload of
//! both collections from the backend, sign-out wipes them immediately so no
//! observer can render the previous shopper's data.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cart::CartStore;
use crate::identity::AuthState;
use crate::wishlist::WishlistStore;

/// Handle to the coordination task. Dropping it stops the coordination; the
/// stores themselves keep working but no longer react to identity changes.
pub struct SessionCoordinator {
    handle: JoinHandle<()>,
}

impl SessionCoordinator {
    /// Spawn the coordination task.
    ///
    /// The task processes the current identity immediately, then wakes on
    /// every transition. It exits when the identity handle is dropped.
    #[must_use]
    pub fn spawn(
        mut identity: watch::Receiver<AuthState>,
        cart: CartStore,
        wishlist: WishlistStore,
    ) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let auth = identity.borrow_and_update().clone();
                match auth {
                    AuthState::SignedIn { ref user, epoch } => {
                        info!(user_id = %user.id, epoch, "identity signed in; reloading session stores");
                        let (cart_result, wishlist_result) =
                            tokio::join!(cart.reload(), wishlist.reload());
                        // Failures are already reflected in the store
                        // snapshots; nothing further to do here.
                        if let Err(e) = cart_result {
                            debug!(error = %e, "cart reload did not complete");
                        }
                        if let Err(e) = wishlist_result {
                            debug!(error = %e, "wishlist reload did not complete");
                        }
                    }
                    AuthState::Anonymous { epoch } => {
                        debug!(epoch, "identity is anonymous; resetting session stores");
                        cart.reset();
                        wishlist.reset();
                    }
                }
                if identity.changed().await.is_err() {
                    debug!("identity signal closed; stopping session coordination");
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
