//! Checkout state machine.
//!
//! One [`CheckoutFlow`] drives a single attempt through
//! `SelectingAddress -> SelectingPayment -> AuthorizingPayment ->
//! CreatingOrder -> Completed`, with `Failed` reachable from the payment and
//! order steps. Card payments authorize against the external gateway before
//! the order is created; other methods skip straight to order creation and
//! the backend records a pending payment.
//!
//! The cart snapshot is frozen when the attempt begins. If the live cart
//! diverges before submission the submit is refused until the shopper
//! re-confirms via [`CheckoutFlow::refresh_snapshot`], so the amount that
//! was authorized is always the amount that is charged.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use lunaria_api::{
    ApiError, CardDetails, CommerceClient, PaymentAuthorization, PaymentClient, PaymentError,
    types::{Address, CartItem, NewAddress, Order, OrderRequest},
};
use lunaria_core::{AddressId, Money, PaymentMethod, UserId};

use crate::cart::CartStore;
use crate::error::CheckoutError;
use crate::identity::{AuthState, Epoch};
use crate::inflight::InFlight;

/// Where the current checkout attempt stands.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutStage {
    /// No attempt in progress.
    Idle,
    /// Choosing (or creating) a shipping address.
    SelectingAddress,
    /// Choosing how to pay.
    SelectingPayment,
    /// Waiting on the external gateway to authorize the entered card.
    AuthorizingPayment,
    /// Ready to submit, or submission in flight.
    CreatingOrder,
    /// The backend confirmed the order. Terminal.
    Completed(Order),
    /// The attempt failed; see [`CheckoutFailure`] for whether it is
    /// resumable.
    Failed(CheckoutFailure),
}

/// Classified checkout failure, so the caller can pick the right next step
/// instead of inspecting status codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutFailure {
    /// The gateway declined the card. Resumable: the shopper may re-enter
    /// card details via [`CheckoutFlow::retry_payment`] without losing their
    /// address and method selections.
    PaymentRejected { code: String, message: String },
    /// The backend refused the order over stock. The shopper should review
    /// the cart, not retry payment.
    OutOfStock(String),
    /// Generic server-side failure.
    Server(String),
}

/// Selections and frozen inputs for one checkout attempt.
struct CheckoutSession {
    /// Identity epoch the attempt belongs to; a transition invalidates it.
    epoch: Epoch,
    /// Owner of the address book being edited.
    user_id: UserId,
    /// Cart lines frozen at entry.
    snapshot: Vec<CartItem>,
    /// Total of the frozen snapshot; the amount that gets authorized.
    total: Money,
    addresses: Vec<Address>,
    selected_address: Option<AddressId>,
    payment_method: Option<PaymentMethod>,
    authorization: Option<PaymentAuthorization>,
    /// One key per attempt; a retried submission reuses it so the backend
    /// can deduplicate.
    idempotency_key: Uuid,
}

/// Orchestrates one checkout attempt at a time.
///
/// Cheap to clone; all clones share the same attempt.
#[derive(Clone)]
pub struct CheckoutFlow {
    inner: Arc<CheckoutFlowInner>,
}

struct CheckoutFlowInner {
    client: CommerceClient,
    payment: PaymentClient,
    cart: CartStore,
    identity: watch::Receiver<AuthState>,
    stage: watch::Sender<CheckoutStage>,
    session: Mutex<Option<CheckoutSession>>,
    inflight: InFlight,
}

impl CheckoutFlow {
    /// Create an idle flow.
    #[must_use]
    pub fn new(
        client: CommerceClient,
        payment: PaymentClient,
        cart: CartStore,
        identity: watch::Receiver<AuthState>,
    ) -> Self {
        let (stage, _) = watch::channel(CheckoutStage::Idle);
        Self {
            inner: Arc::new(CheckoutFlowInner {
                client,
                payment,
                cart,
                identity,
                stage,
                session: Mutex::new(None),
                inflight: InFlight::default(),
            }),
        }
    }

    /// Subscribe to stage broadcasts; the receiver immediately sees the
    /// latest stage, and dropping it unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutStage> {
        self.inner.stage.subscribe()
    }

    /// The current stage.
    #[must_use]
    pub fn stage(&self) -> CheckoutStage {
        self.inner.stage.borrow().clone()
    }

    /// The shopper's saved addresses, as loaded for this attempt.
    #[must_use]
    pub fn addresses(&self) -> Vec<Address> {
        self.lock_session()
            .as_ref()
            .map(|s| s.addresses.clone())
            .unwrap_or_default()
    }

    /// The frozen total this attempt will charge.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.lock_session().as_ref().map(|s| s.total)
    }

    /// Start a fresh attempt, replacing any previous one.
    ///
    /// Freezes the current cart snapshot, loads the address book, preselects
    /// the default address if one exists, and enters `SelectingAddress`.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` or `EmptyCart` before any network call, `WrongStage`
    /// while another `begin` is still loading; otherwise the address-list
    /// failure.
    #[instrument(skip(self))]
    pub async fn begin(&self) -> Result<(), CheckoutError> {
        let (user_id, epoch) = match &*self.inner.identity.borrow() {
            AuthState::SignedIn { user, epoch } => (user.id, *epoch),
            AuthState::Anonymous { .. } => return Err(CheckoutError::NotSignedIn),
        };
        let cart = self.inner.cart.current();
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let Some(_guard) = self.inner.inflight.try_begin("begin") else {
            debug!("checkout entry already in flight");
            return Err(CheckoutError::WrongStage { operation: "begin" });
        };

        let addresses = self.inner.client.list_addresses(user_id).await?;
        self.discard_if_stale(epoch)?;
        let selected_address = addresses.iter().find(|a| a.is_default).map(|a| a.id);

        let idempotency_key = Uuid::new_v4();
        info!(%idempotency_key, total = %cart.total_price, "checkout started");
        *self.lock_session() = Some(CheckoutSession {
            epoch,
            user_id,
            snapshot: cart.items,
            total: cart.total_price,
            addresses,
            selected_address,
            payment_method: None,
            authorization: None,
            idempotency_key,
        });
        self.inner.stage.send_replace(CheckoutStage::SelectingAddress);
        Ok(())
    }

    /// Drop the current attempt and return to `Idle`.
    ///
    /// An authorization already obtained is simply abandoned; no release
    /// message is sent to the gateway.
    pub fn abandon(&self) {
        *self.lock_session() = None;
        self.inner.stage.send_replace(CheckoutStage::Idle);
    }

    /// Create a new address inline, refresh the address book and preselect
    /// the created one. Stays in `SelectingAddress`; advancing still goes
    /// through [`CheckoutFlow::select_address`].
    ///
    /// # Errors
    ///
    /// `WrongStage` outside `SelectingAddress`; otherwise the API failure.
    #[instrument(skip(self, address))]
    pub async fn create_address(&self, address: &NewAddress) -> Result<Address, CheckoutError> {
        self.require_stage(&CheckoutStage::SelectingAddress, "create_address")?;
        self.check_epoch()?;
        let (user_id, epoch) = self
            .lock_session()
            .as_ref()
            .map(|s| (s.user_id, s.epoch))
            .ok_or(CheckoutError::NotSignedIn)?;

        let created = self.inner.client.create_address(user_id, address).await?;
        let addresses = self.inner.client.list_addresses(user_id).await?;
        self.discard_if_stale(epoch)?;

        let mut session = self.lock_session();
        if let Some(session) = session.as_mut() {
            session.addresses = addresses;
            session.selected_address = Some(created.id);
        }
        Ok(created)
    }

    /// Choose the shipping address and advance to `SelectingPayment`.
    ///
    /// # Errors
    ///
    /// `WrongStage` outside `SelectingAddress`, `UnknownAddress` when the id
    /// is not in the loaded address book.
    pub fn select_address(&self, address_id: AddressId) -> Result<(), CheckoutError> {
        self.require_stage(&CheckoutStage::SelectingAddress, "select_address")?;
        self.check_epoch()?;

        let mut session = self.lock_session();
        let Some(session) = session.as_mut() else {
            return Err(CheckoutError::NotSignedIn);
        };
        if !session.addresses.iter().any(|a| a.id == address_id) {
            return Err(CheckoutError::UnknownAddress(address_id));
        }
        session.selected_address = Some(address_id);
        drop(session);
        self.inner.stage.send_replace(CheckoutStage::SelectingPayment);
        Ok(())
    }

    /// Choose the payment method. Card advances to `AuthorizingPayment`;
    /// every other method goes straight to `CreatingOrder` and the backend
    /// creates the order with payment pending.
    ///
    /// # Errors
    ///
    /// `WrongStage` outside `SelectingPayment`.
    pub fn select_payment(&self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.require_stage(&CheckoutStage::SelectingPayment, "select_payment")?;
        self.check_epoch()?;

        {
            let mut session = self.lock_session();
            let Some(session) = session.as_mut() else {
                return Err(CheckoutError::NotSignedIn);
            };
            session.payment_method = Some(method);
            session.authorization = None;
        }
        let next = if method.requires_authorization() {
            CheckoutStage::AuthorizingPayment
        } else {
            CheckoutStage::CreatingOrder
        };
        self.inner.stage.send_replace(next);
        Ok(())
    }

    /// Authorize the entered card for the frozen total.
    ///
    /// A decline moves to `Failed(PaymentRejected)` but keeps the session
    /// resumable via [`CheckoutFlow::retry_payment`]. Transport and gateway
    /// failures leave the stage unchanged so the same call can be retried.
    ///
    /// # Errors
    ///
    /// `WrongStage` outside `AuthorizingPayment`; otherwise the gateway
    /// failure.
    #[instrument(skip(self, card))]
    pub async fn authorize(&self, card: CardDetails) -> Result<(), CheckoutError> {
        self.require_stage(&CheckoutStage::AuthorizingPayment, "authorize")?;
        self.check_epoch()?;
        let Some(_guard) = self.inner.inflight.try_begin("authorize") else {
            return Err(CheckoutError::WrongStage {
                operation: "authorize",
            });
        };
        let (total, epoch) = self
            .lock_session()
            .as_ref()
            .map(|s| (s.total, s.epoch))
            .ok_or(CheckoutError::NotSignedIn)?;

        let outcome = self.inner.payment.authorize(&card, total).await;
        self.discard_if_stale(epoch)?;
        match outcome {
            Ok(authorization) => {
                info!(authorization_id = %authorization.id, "card authorized");
                if let Some(session) = self.lock_session().as_mut() {
                    session.authorization = Some(authorization);
                }
                self.inner.stage.send_replace(CheckoutStage::CreatingOrder);
                Ok(())
            }
            Err(PaymentError::Declined { code, message }) => {
                warn!(%code, "card declined");
                self.inner
                    .stage
                    .send_replace(CheckoutStage::Failed(CheckoutFailure::PaymentRejected {
                        code: code.clone(),
                        message: message.clone(),
                    }));
                Err(PaymentError::Declined { code, message }.into())
            }
            Err(e) => {
                warn!(error = %e, "card authorization failed; stage unchanged");
                Err(e.into())
            }
        }
    }

    /// Return from a card decline to `AuthorizingPayment` so the shopper can
    /// enter different card details. Address and method selections survive.
    ///
    /// # Errors
    ///
    /// `WrongStage` unless the stage is `Failed(PaymentRejected)`.
    pub fn retry_payment(&self) -> Result<(), CheckoutError> {
        let resumable = matches!(
            &*self.inner.stage.borrow(),
            CheckoutStage::Failed(CheckoutFailure::PaymentRejected { .. })
        );
        if !resumable {
            return Err(CheckoutError::WrongStage {
                operation: "retry_payment",
            });
        }
        self.check_epoch()?;
        self.inner
            .stage
            .send_replace(CheckoutStage::AuthorizingPayment);
        Ok(())
    }

    /// Whether the live cart has diverged from the frozen snapshot.
    #[must_use]
    pub fn cart_changed(&self) -> bool {
        let live = self.inner.cart.current();
        self.lock_session()
            .as_ref()
            .is_some_and(|s| !snapshot_matches(&s.snapshot, &live.items))
    }

    /// Re-freeze the snapshot from the live cart after the shopper confirmed
    /// the change. Any card authorization is discarded because it covered
    /// the old total, and a fresh idempotency key marks the new attempt.
    ///
    /// # Errors
    ///
    /// `EmptyCart` when the live cart emptied out; the attempt is abandoned
    /// in that case.
    pub fn refresh_snapshot(&self) -> Result<(), CheckoutError> {
        self.check_epoch()?;
        let live = self.inner.cart.current();
        if live.is_empty() {
            self.abandon();
            return Err(CheckoutError::EmptyCart);
        }

        let mut session = self.lock_session();
        let Some(session) = session.as_mut() else {
            return Err(CheckoutError::NotSignedIn);
        };
        let card = session
            .payment_method
            .is_some_and(PaymentMethod::requires_authorization);
        session.snapshot = live.items;
        session.total = live.total_price;
        session.authorization = None;
        session.idempotency_key = Uuid::new_v4();
        let has_method = session.payment_method.is_some();
        drop(session);

        if card {
            self.inner
                .stage
                .send_replace(CheckoutStage::AuthorizingPayment);
        } else if has_method {
            self.inner.stage.send_replace(CheckoutStage::CreatingOrder);
        }
        Ok(())
    }

    /// Submit the order.
    ///
    /// Single-flight: a second call while one is pending returns
    /// `SubmitInFlight` without a network call. A stock conflict moves to
    /// `Failed(OutOfStock)`; transport failures leave the stage at
    /// `CreatingOrder` so the call can be retried with the same idempotency
    /// key; any other server failure moves to `Failed(Server)`. Success
    /// clears the cart store (the backend consumed the cart) and enters
    /// `Completed`. A response that lands after an identity transition is
    /// discarded without touching the cart or the stage outcome.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`].
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<Order, CheckoutError> {
        self.require_stage(&CheckoutStage::CreatingOrder, "submit")?;
        self.check_epoch()?;
        let Some(_guard) = self.inner.inflight.try_begin("submit") else {
            debug!("order submission already in flight");
            return Err(CheckoutError::SubmitInFlight);
        };
        if self.cart_changed() {
            warn!("cart changed since checkout began; refusing to submit");
            return Err(CheckoutError::CartChanged);
        }

        let (request, idempotency_key, epoch) = {
            let session = self.lock_session();
            let Some(session) = session.as_ref() else {
                return Err(CheckoutError::NotSignedIn);
            };
            let address_id = session
                .selected_address
                .ok_or(CheckoutError::NoAddressSelected)?;
            let payment_method = session
                .payment_method
                .ok_or(CheckoutError::NoPaymentMethodSelected)?;
            let payment_confirmation_id = if payment_method.requires_authorization() {
                let auth = session
                    .authorization
                    .as_ref()
                    .ok_or(CheckoutError::AuthorizationMissing)?;
                Some(auth.id.clone())
            } else {
                None
            };
            (
                OrderRequest {
                    shipping_address_id: address_id,
                    billing_address_id: address_id,
                    payment_method,
                    payment_confirmation_id,
                },
                session.idempotency_key,
                session.epoch,
            )
        };

        let outcome = self.inner.client.create_order(&request, idempotency_key).await;
        self.discard_if_stale(epoch)?;
        match outcome {
            Ok(order) => {
                info!(order_id = %order.id, "order confirmed");
                self.inner.cart.reset();
                *self.lock_session() = None;
                self.inner
                    .stage
                    .send_replace(CheckoutStage::Completed(order.clone()));
                Ok(order)
            }
            Err(ApiError::Conflict(message)) => {
                warn!(%message, "order refused over stock; directing shopper back to the cart");
                self.inner
                    .stage
                    .send_replace(CheckoutStage::Failed(CheckoutFailure::OutOfStock(
                        message.clone(),
                    )));
                Err(ApiError::Conflict(message).into())
            }
            Err(e @ (ApiError::Network(_) | ApiError::RateLimited(_))) => {
                warn!(error = %e, "order submission failed transiently; retry keeps the same idempotency key");
                Err(e.into())
            }
            Err(e) => {
                warn!(error = %e, "order submission failed");
                self.inner
                    .stage
                    .send_replace(CheckoutStage::Failed(CheckoutFailure::Server(
                        e.to_string(),
                    )));
                Err(e.into())
            }
        }
    }

    fn require_stage(
        &self,
        expected: &CheckoutStage,
        operation: &'static str,
    ) -> Result<(), CheckoutError> {
        if *self.inner.stage.borrow() == *expected {
            Ok(())
        } else {
            Err(CheckoutError::WrongStage { operation })
        }
    }

    /// Discard a remote response that landed after an identity transition.
    ///
    /// Entry-time epoch checks cannot catch a sign-out that happens while a
    /// request is in flight, so every remote operation re-checks here after
    /// its await. The dead attempt is dropped without touching the cart
    /// store; if a newer attempt already replaced the session, it is left
    /// alone.
    fn discard_if_stale(&self, epoch: Epoch) -> Result<(), CheckoutError> {
        if self.inner.identity.borrow().epoch() == epoch {
            return Ok(());
        }
        debug!("identity changed while the request was in flight; discarding the response");
        let mut session = self.lock_session();
        if session.as_ref().is_some_and(|s| s.epoch == epoch) {
            *session = None;
            drop(session);
            self.inner.stage.send_replace(CheckoutStage::Idle);
        }
        Err(CheckoutError::NotSignedIn)
    }

    /// An identity transition mid-checkout invalidates the attempt.
    fn check_epoch(&self) -> Result<(), CheckoutError> {
        let current = self.inner.identity.borrow().epoch();
        let session_epoch = self.lock_session().as_ref().map(|s| s.epoch);
        match session_epoch {
            Some(epoch) if epoch == current => Ok(()),
            _ => {
                debug!("identity changed mid-checkout; abandoning the attempt");
                self.abandon();
                Err(CheckoutError::NotSignedIn)
            }
        }
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<CheckoutSession>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Line-for-line comparison between the frozen snapshot and the live cart.
/// Order matters; the server returns lines in a stable order.
fn snapshot_matches(frozen: &[CartItem], live: &[CartItem]) -> bool {
    frozen == live
}
