//! Lunaria Session - the reactive commerce-state layer.
//!
//! # Architecture
//!
//! Every store owns exactly one mutable snapshot and broadcasts it on a
//! `tokio::sync::watch` channel: `subscribe()` hands out a receiver that
//! immediately sees the latest value, and dropping the receiver is the
//! unsubscribe. Nothing outside a store mutates its snapshot.
//!
//! - [`identity`] - authentication signal with monotonically increasing
//!   epochs; in-flight remote responses from a previous epoch are discarded
//! - [`cart`] / [`wishlist`] - remote-backed stores; every successful
//!   mutation wholesale-replaces the snapshot with the server's response
//! - [`comparison`] - bounded, purely client-local store persisted to a
//!   JSON file, independent of authentication
//! - [`coordinator`] - reloads the remote-backed stores on sign-in and
//!   resets them to explicit empty on sign-out
//! - [`checkout`] - the address / payment-authorization / order-creation
//!   state machine, with a cart snapshot frozen at entry
//!
//! # Example
//!
//! ```rust,ignore
//! let (identity, identity_rx) = IdentityHandle::new();
//! let cart = CartStore::new(client.clone(), identity_rx.clone());
//! let wishlist = WishlistStore::new(client.clone(), identity_rx.clone());
//! let _coordinator = SessionCoordinator::spawn(identity_rx, cart.clone(), wishlist);
//!
//! identity.sign_in(user);          // triggers cart + wishlist reload
//! cart.add(ProductId::new(42), 1).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod comparison;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod wishlist;

mod inflight;

pub use cart::{CartState, CartStore};
pub use checkout::{CheckoutFailure, CheckoutFlow, CheckoutStage};
pub use comparison::{CompareOutcome, ComparisonEntry, ComparisonState, ComparisonStore, MAX_COMPARE};
pub use coordinator::SessionCoordinator;
pub use error::{CheckoutError, StoreError};
pub use identity::{AuthState, Epoch, IdentityHandle, UserInfo};
pub use wishlist::{WishlistState, WishlistStore};
