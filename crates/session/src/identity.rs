//! Authentication signal and identity epochs.
//!
//! The identity/session provider (an external collaborator) drives an
//! [`IdentityHandle`]; everything in this crate only consumes the resulting
//! watch channel. Each transition - in either direction - bumps a
//! monotonically increasing epoch, and every remote response carries the
//! epoch of the request that produced it. A response whose epoch no longer
//! matches the current one belongs to a previous session and is discarded.

use tokio::sync::watch;

use lunaria_core::UserId;

/// Monotonically increasing session token.
pub type Epoch = u64;

/// The signed-in shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// User ID, used for address endpoints.
    pub id: UserId,
    /// Email, for display only.
    pub email: String,
}

/// Current authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Nobody is signed in.
    Anonymous { epoch: Epoch },
    /// A shopper is signed in.
    SignedIn { user: UserInfo, epoch: Epoch },
}

impl AuthState {
    /// The epoch of this state.
    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        match self {
            Self::Anonymous { epoch } | Self::SignedIn { epoch, .. } => *epoch,
        }
    }

    /// Whether a shopper is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }

    /// The signed-in shopper, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserInfo> {
        match self {
            Self::SignedIn { user, .. } => Some(user),
            Self::Anonymous { .. } => None,
        }
    }
}

/// Publisher side of the authentication signal.
///
/// Held by the identity/session provider. Stores and the coordinator hold
/// receivers only.
#[derive(Debug)]
pub struct IdentityHandle {
    tx: watch::Sender<AuthState>,
}

impl IdentityHandle {
    /// Create the signal, starting anonymous at epoch 0.
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<AuthState>) {
        let (tx, rx) = watch::channel(AuthState::Anonymous { epoch: 0 });
        (Self { tx }, rx)
    }

    /// Publish a sign-in transition.
    pub fn sign_in(&self, user: UserInfo) {
        self.tx.send_modify(|state| {
            *state = AuthState::SignedIn {
                user,
                epoch: state.epoch() + 1,
            };
        });
    }

    /// Publish a sign-out transition.
    pub fn sign_out(&self) {
        self.tx.send_modify(|state| {
            *state = AuthState::Anonymous {
                epoch: state.epoch() + 1,
            };
        });
    }

    /// Subscribe to the signal; the receiver immediately sees the latest
    /// state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> UserInfo {
        UserInfo {
            id: UserId::new(id),
            email: format!("user{id}@example.com"),
        }
    }

    #[test]
    fn test_epoch_increases_on_every_transition() {
        let (handle, rx) = IdentityHandle::new();
        assert_eq!(rx.borrow().epoch(), 0);

        handle.sign_in(user(1));
        assert_eq!(rx.borrow().epoch(), 1);
        assert!(rx.borrow().is_signed_in());

        handle.sign_out();
        assert_eq!(rx.borrow().epoch(), 2);
        assert!(!rx.borrow().is_signed_in());

        handle.sign_in(user(2));
        assert_eq!(rx.borrow().epoch(), 3);
        assert_eq!(rx.borrow().user().map(|u| u.id), Some(UserId::new(2)));
    }

    #[test]
    fn test_new_subscriber_sees_latest_state() {
        let (handle, _rx) = IdentityHandle::new();
        handle.sign_in(user(7));

        let late = handle.subscribe();
        assert!(late.borrow().is_signed_in());
        assert_eq!(late.borrow().epoch(), 1);
    }
}
