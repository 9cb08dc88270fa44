//! The checkout orchestrator.

use backend::{
    IdempotencyKey, OrderApi, PaymentApi, PaypalCreateRequest, PaypalOrder, ReceiptFile,
    ShippingApi, StcConfirmRequest,
};
use common::OrderId;
use domain::{
    AddressField, AppliedCoupon, Cart, DomainEvent, GeoPoint, OrderContext, OrderLine,
    OrderPayload, OrderTotals, PaymentMethod, ShippingAddress,
};
use storage::{StateStore, StateStoreExt, keys};
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;

use crate::cart_access::CartAccess;
use crate::config::CheckoutConfig;
use crate::draft::OrderDraft;
use crate::error::{CheckoutError, PaymentError, Result};
use crate::events::CheckoutEvent;
use crate::payment::{PaymentProgress, PaymentStart, StcOutcome};
use crate::phase::CheckoutPhase;
use crate::shipping;

struct CheckoutState {
    phase: CheckoutPhase,
    phase_entered: Instant,
    draft: OrderDraft,
    /// Address persisted by an earlier visit.
    saved_address: Option<ShippingAddress>,
    last_coupon: Option<String>,
    /// User-facing message from the last failed operation.
    message: Option<String>,
    cart_cleared: bool,
}

/// Drives one checkout from address entry to a placed order.
///
/// Operations are serialized: each holds the checkout state for its whole
/// duration, network calls included, so two UI actions can never race to
/// create the same order.
pub struct CheckoutOrchestrator<C, O, Sh, P, S> {
    config: CheckoutConfig,
    cart: C,
    orders: O,
    shipping: Sh,
    payments: P,
    storage: S,
    state: Mutex<CheckoutState>,
    events: broadcast::Sender<CheckoutEvent>,
}

impl<C, O, Sh, P, S> CheckoutOrchestrator<C, O, Sh, P, S>
where
    C: CartAccess,
    O: OrderApi,
    Sh: ShippingApi,
    P: PaymentApi,
    S: StateStore,
{
    /// Creates an orchestrator, loading the persisted address and last coupon.
    pub async fn open(
        config: CheckoutConfig,
        cart: C,
        orders: O,
        shipping: Sh,
        payments: P,
        storage: S,
    ) -> Result<Self> {
        let saved_address: Option<ShippingAddress> =
            storage.load_state(keys::CHECKOUT_ADDRESS).await?;
        let last_coupon: Option<String> = storage.load_state(keys::LAST_COUPON).await?;
        let default_method = config
            .enabled_methods
            .first()
            .copied()
            .unwrap_or(PaymentMethod::Cod);

        let (events, _) = broadcast::channel(64);
        Ok(Self {
            state: Mutex::new(CheckoutState {
                phase: CheckoutPhase::Address,
                phase_entered: Instant::now(),
                draft: OrderDraft::new(default_method),
                saved_address,
                last_coupon,
                message: None,
                cart_cleared: false,
            }),
            config,
            cart,
            orders,
            shipping,
            payments,
            storage,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CheckoutEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Current phase, after applying the empty-cart guard.
    pub async fn phase(&self) -> CheckoutPhase {
        let mut state = self.state.lock().await;
        // An empty cart shows up as the EmptyCart phase.
        let _ = self.check_cart(&mut state).await;
        state.phase
    }

    pub async fn draft(&self) -> OrderDraft {
        self.state.lock().await.draft.clone()
    }

    pub async fn message(&self) -> Option<String> {
        self.state.lock().await.message.clone()
    }

    pub async fn saved_address(&self) -> Option<ShippingAddress> {
        self.state.lock().await.saved_address.clone()
    }

    /// The coupon code applied on an earlier visit, for prefilling.
    pub async fn last_coupon(&self) -> Option<String> {
        self.state.lock().await.last_coupon.clone()
    }

    /// Totals for the current cart and draft.
    pub async fn totals(&self) -> OrderTotals {
        let state = self.state.lock().await;
        let cart = self.cart.snapshot().await;
        self.price(&state.draft, &cart).0
    }

    /// Sets one address field, persists the address and re-quotes shipping
    /// if the destination changed.
    #[tracing::instrument(skip(self, value))]
    pub async fn update_address_field(
        &self,
        field: AddressField,
        value: impl Into<String> + Send,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "edit the address").await?;

        state.draft.address.set_field(field, value);
        state.draft.touched.insert(field);
        self.storage
            .save_state(keys::CHECKOUT_ADDRESS, &state.draft.address)
            .await?;
        if field.affects_shipping() {
            self.refresh_shipping(&mut state).await;
        }
        Ok(())
    }

    /// Sets or clears the map pin and re-quotes shipping.
    #[tracing::instrument(skip(self))]
    pub async fn set_geo(&self, geo: Option<GeoPoint>) -> Result<()> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "edit the address").await?;

        state.draft.address.geo = geo;
        self.storage
            .save_state(keys::CHECKOUT_ADDRESS, &state.draft.address)
            .await?;
        self.refresh_shipping(&mut state).await;
        Ok(())
    }

    /// Copies the address saved on an earlier visit into the draft.
    /// Returns false if there is none.
    #[tracing::instrument(skip(self))]
    pub async fn use_saved_address(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "edit the address").await?;

        let Some(saved) = state.saved_address.clone() else {
            return Ok(false);
        };
        state.draft.address = saved;
        self.storage
            .save_state(keys::CHECKOUT_ADDRESS, &state.draft.address)
            .await?;
        self.refresh_shipping(&mut state).await;
        Ok(true)
    }

    /// Validates the address and moves on to payment.
    ///
    /// On failure every field is marked touched, `focus` names the first
    /// invalid field and the phase does not change.
    #[tracing::instrument(skip(self))]
    pub async fn submit_address(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "submit the address").await?;
        if !state.phase.can_submit_address() {
            return Err(CheckoutError::invalid_phase("submit the address", state.phase));
        }

        if let Err(errors) = state.draft.address.validate() {
            state.draft.reveal_errors(&errors);
            return Err(CheckoutError::InvalidAddress(errors));
        }
        state.draft.focus = None;
        self.refresh_shipping(&mut state).await;
        self.transition(&mut state, CheckoutPhase::Payment);
        Ok(())
    }

    /// Returns to the address phase without losing the draft.
    #[tracing::instrument(skip(self))]
    pub async fn edit_address(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "edit the address").await?;
        self.transition(&mut state, CheckoutPhase::Address);
        Ok(())
    }

    /// Steps back one phase.
    #[tracing::instrument(skip(self))]
    pub async fn back(&self) -> Result<CheckoutPhase> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "go back").await?;
        let previous = state
            .phase
            .previous()
            .ok_or_else(|| CheckoutError::invalid_phase("go back", state.phase))?;
        self.transition(&mut state, previous);
        Ok(previous)
    }

    /// Selects a payment method. A method that is not enabled falls back to
    /// the first enabled one; the method actually selected is returned.
    #[tracing::instrument(skip(self))]
    pub async fn select_payment_method(&self, method: PaymentMethod) -> Result<PaymentMethod> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "choose a payment method").await?;

        let chosen = if self.config.is_enabled(method) {
            method
        } else {
            let fallback = self
                .config
                .enabled_methods
                .first()
                .copied()
                .ok_or(PaymentError::MethodDisabled(method))?;
            tracing::info!(requested = %method, chosen = %fallback, "payment method not enabled");
            fallback
        };

        if state.draft.payment_method != chosen {
            state.draft.payment = PaymentProgress::NotStarted;
        }
        state.draft.payment_method = chosen;
        Ok(chosen)
    }

    /// Applies a coupon code. A blank code removes the coupon and forgets
    /// the remembered one.
    ///
    /// Unknown codes are kept as applied with no effect, so the UI can show
    /// that nothing was discounted.
    #[tracing::instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> Result<Option<AppliedCoupon>> {
        let mut state = self.state.lock().await;
        let cart = self.editable(&mut state, "apply a coupon").await?;

        let Some(applied) = self.config.coupons.resolve(code, cart.subtotal()) else {
            state.draft.coupon_code = None;
            if state.last_coupon.take().is_some() {
                self.storage.remove(keys::LAST_COUPON).await?;
            }
            return Ok(None);
        };

        let normalized = applied.code.to_uppercase();
        state.draft.coupon_code = Some(normalized.clone());
        self.storage.save_state(keys::LAST_COUPON, &normalized).await?;
        state.last_coupon = Some(normalized.clone());

        tracing::info!(
            code = %normalized,
            recognized = applied.recognized,
            discount = %applied.discount,
            "coupon applied"
        );
        self.emit(CheckoutEvent::CouponApplied {
            code: normalized,
            recognized: applied.recognized,
            discount: applied.discount,
        });
        Ok(Some(applied))
    }

    /// Saves the order and moves to review.
    #[tracing::instrument(skip(self))]
    pub async fn advance_to_review(&self) -> Result<OrderId> {
        let mut state = self.state.lock().await;
        let cart = self.editable(&mut state, "review the order").await?;
        if !state.phase.can_advance_to_review() {
            return Err(CheckoutError::invalid_phase("review the order", state.phase));
        }

        if let Err(errors) = state.draft.address.validate() {
            state.draft.reveal_errors(&errors);
            return Err(CheckoutError::InvalidAddress(errors));
        }

        let order_id = self.ensure_order_locked(&mut state, &cart, false).await?;
        self.transition(&mut state, CheckoutPhase::Review);
        Ok(order_id)
    }

    /// Re-validates the address, saves the order and opens the payment step.
    ///
    /// An address that became invalid while reviewing sends the shopper back
    /// to the address phase.
    #[tracing::instrument(skip(self))]
    pub async fn open_real_payment(&self) -> Result<OrderId> {
        let mut state = self.state.lock().await;
        let cart = self.editable(&mut state, "open payment").await?;
        if !state.phase.can_open_real_payment() {
            return Err(CheckoutError::invalid_phase("open payment", state.phase));
        }

        if let Err(errors) = state.draft.address.validate() {
            state.draft.reveal_errors(&errors);
            self.transition(&mut state, CheckoutPhase::Address);
            return Err(CheckoutError::InvalidAddress(errors));
        }

        let order_id = self.ensure_order_locked(&mut state, &cart, false).await?;
        self.transition(&mut state, CheckoutPhase::RealPayment);
        Ok(order_id)
    }

    /// Makes sure a remote order reflects the draft and returns its id.
    ///
    /// An existing order is patched; a new one is created only when there is
    /// none yet, the patch was rejected, or `force_rebuild` is set.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_order(&self, force_rebuild: bool) -> Result<OrderId> {
        let mut state = self.state.lock().await;
        let cart = self.editable(&mut state, "save the order").await?;
        self.ensure_order_locked(&mut state, &cart, force_rebuild)
            .await
    }

    /// Starts the payment sub-protocol for `method`.
    ///
    /// Cash on delivery completes the checkout immediately. The other methods
    /// leave the checkout in the payment step with follow-up state in
    /// [`OrderDraft::payment`].
    #[tracing::instrument(skip(self))]
    pub async fn start_payment(&self, method: PaymentMethod) -> Result<PaymentStart> {
        let mut state = self.state.lock().await;
        let cart = self.editable(&mut state, "start a payment").await?;
        if !state.phase.can_pay() {
            return Err(CheckoutError::invalid_phase("start a payment", state.phase));
        }
        if !self.config.is_enabled(method) {
            return Err(PaymentError::MethodDisabled(method).into());
        }

        state.draft.payment_method = method;
        let result = self.run_payment(&mut state, &cart, method).await;
        if let Err(e) = &result {
            tracing::warn!(method = %method, error = %e, "payment start failed");
            state.message = Some(e.to_string());
        }
        result
    }

    /// Reports the outcome of the STC Pay session. `success = false` is the
    /// decline path and still goes to the provider.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_stc(&self, success: bool) -> Result<StcOutcome> {
        let mut state = self.state.lock().await;
        let cart = self.editable(&mut state, "confirm STC Pay").await?;
        let PaymentProgress::StcSession { session_id } = state.draft.payment.clone() else {
            return Err(PaymentError::NoStcSession.into());
        };

        let order_id = self.ensure_order_locked(&mut state, &cart, false).await?;
        let request = StcConfirmRequest {
            order_id,
            session_id,
            success,
        };
        let response = self
            .payments
            .stc_confirm(&request, &IdempotencyKey::generate())
            .await
            .map_err(|source| provider(PaymentMethod::Stc, source))?;

        if success && response.success {
            self.finalize_locked(&mut state).await?;
            return Ok(StcOutcome::Paid);
        }
        tracing::info!(status = %response.status, "STC Pay session not paid");
        state.draft.payment = PaymentProgress::NotStarted;
        Ok(StcOutcome::Declined {
            status: response.status,
        })
    }

    /// Drops the STC Pay session locally without contacting the provider.
    pub async fn cancel_stc_session(&self) {
        let mut state = self.state.lock().await;
        if matches!(state.draft.payment, PaymentProgress::StcSession { .. }) {
            state.draft.payment = PaymentProgress::NotStarted;
        }
    }

    /// Uploads a bank transfer receipt. May be repeated to replace it.
    #[tracing::instrument(skip(self, receipt), fields(file = %receipt.file_name))]
    pub async fn upload_bank_receipt(&self, receipt: ReceiptFile) -> Result<String> {
        let mut state = self.state.lock().await;
        self.editable(&mut state, "upload a receipt").await?;
        if receipt.bytes.is_empty() {
            return Err(PaymentError::EmptyReceipt.into());
        }
        if !matches!(state.draft.payment, PaymentProgress::BankTransfer { .. }) {
            return Err(PaymentError::NoBankTransfer.into());
        }
        let order_id = state
            .draft
            .remote_order_id
            .clone()
            .ok_or(PaymentError::NoBankTransfer)?;

        let response = self
            .payments
            .bank_upload_receipt(&order_id, receipt, &IdempotencyKey::generate())
            .await
            .map_err(|source| provider(PaymentMethod::Bank, source))?;
        let receipt_url = response
            .receipt_url
            .filter(|url| !url.is_empty())
            .ok_or(PaymentError::MissingReceiptUrl)?;

        if let PaymentProgress::BankTransfer { receipts, .. } = &mut state.draft.payment {
            receipts.push(receipt_url.clone());
        }
        self.emit(CheckoutEvent::ReceiptUploaded {
            order_id,
            receipt_url: receipt_url.clone(),
        });
        Ok(receipt_url)
    }

    /// Completes a checkout whose payment was confirmed outside this flow:
    /// a bank transfer with an uploaded receipt, or a PayPal approval.
    #[tracing::instrument(skip(self))]
    pub async fn finalize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.phase == CheckoutPhase::Complete {
            return Ok(());
        }
        self.editable(&mut state, "finish the order").await?;

        let confirmed = match &state.draft.payment {
            PaymentProgress::BankTransfer { receipts, .. } => !receipts.is_empty(),
            PaymentProgress::AwaitingPaypalApproval { .. } => true,
            _ => false,
        };
        if !state.phase.can_pay() || !confirmed {
            return Err(CheckoutError::invalid_phase("finish the order", state.phase));
        }
        self.finalize_locked(&mut state).await
    }

    async fn run_payment(
        &self,
        state: &mut CheckoutState,
        cart: &Cart,
        method: PaymentMethod,
    ) -> Result<PaymentStart> {
        let order_id = self.ensure_order_locked(state, cart, false).await?;
        let key = IdempotencyKey::generate();

        metrics::counter!("checkout_payments_started_total", "method" => method.as_str())
            .increment(1);
        self.emit(CheckoutEvent::PaymentStarted {
            order_id: order_id.clone(),
            method,
        });

        match method {
            PaymentMethod::Cod => {
                self.payments
                    .cod_enable(&order_id, &key)
                    .await
                    .map_err(|source| provider(method, source))?;
                state.draft.payment = PaymentProgress::CashOnDelivery;
                self.finalize_locked(state).await?;
                Ok(PaymentStart::Completed)
            }
            PaymentMethod::Paypal => {
                let (totals, _) = self.price(&state.draft, cart);
                let request = PaypalCreateRequest {
                    order: PaypalOrder {
                        total: totals.grand_total,
                        currency: self.config.currency.clone(),
                        items: cart
                            .items()
                            .iter()
                            .map(|line| OrderLine::from_cart_line(line, &self.config.product_ids))
                            .collect(),
                    },
                    local_order_id: Some(order_id),
                };
                let response = self
                    .payments
                    .paypal_create(&request, &key)
                    .await
                    .map_err(|source| provider(method, source))?;
                let approval_url = response
                    .approval_url
                    .filter(|url| !url.is_empty())
                    .ok_or(PaymentError::MissingApprovalUrl)?;

                state.draft.payment = PaymentProgress::AwaitingPaypalApproval {
                    approval_url: approval_url.clone(),
                    paypal_order_id: response.paypal_order_id,
                };
                Ok(PaymentStart::Redirect { approval_url })
            }
            PaymentMethod::Stc => {
                let response = self
                    .payments
                    .stc_create(&order_id, &key)
                    .await
                    .map_err(|source| provider(method, source))?;
                let session_id = response
                    .session_id
                    .filter(|id| !id.is_empty())
                    .ok_or(PaymentError::MissingSessionId)?;

                state.draft.payment = PaymentProgress::StcSession {
                    session_id: session_id.clone(),
                };
                Ok(PaymentStart::StcSession { session_id })
            }
            PaymentMethod::Bank => {
                let response = self
                    .payments
                    .bank_init(&order_id, &key)
                    .await
                    .map_err(|source| provider(method, source))?;
                let details = response.bank.ok_or(PaymentError::MissingBankDetails)?;

                state.draft.payment = PaymentProgress::BankTransfer {
                    details: details.clone(),
                    receipts: Vec::new(),
                };
                Ok(PaymentStart::BankTransfer(details))
            }
        }
    }

    async fn ensure_order_locked(
        &self,
        state: &mut CheckoutState,
        cart: &Cart,
        force_rebuild: bool,
    ) -> Result<OrderId> {
        state.message = None;
        let payload = self.build_payload(&state.draft, cart).await;

        if let Some(order_id) = state.draft.remote_order_id.clone().filter(|_| !force_rebuild) {
            match self.orders.patch(&order_id, &payload.to_patch()).await {
                Ok(()) => {
                    metrics::counter!("checkout_orders_patched_total").increment(1);
                    tracing::debug!(order_id = %order_id, "order updated");
                    self.emit(CheckoutEvent::OrderUpdated {
                        order_id: order_id.clone(),
                    });
                    return Ok(order_id);
                }
                Err(e) => {
                    tracing::warn!(order_id = %order_id, error = %e, "order patch rejected, creating a new order");
                }
            }
        }

        match self.orders.create(&payload).await {
            Ok(order_id) => {
                metrics::counter!("checkout_orders_created_total").increment(1);
                tracing::info!(order_id = %order_id, items = payload.items.len(), "order created");
                state.draft.remote_order_id = Some(order_id.clone());
                self.emit(CheckoutEvent::OrderCreated {
                    order_id: order_id.clone(),
                });
                Ok(order_id)
            }
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    items = payload.items.len(),
                    payment_method = %payload.payment_method,
                    user_id = %payload.user_id,
                    "order create failed"
                );
                let err = CheckoutError::OrderFailed(e);
                state.message = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn build_payload(&self, draft: &OrderDraft, cart: &Cart) -> OrderPayload {
        let user = self.cart.user().await;
        let (totals, coupon) = self.price(draft, cart);
        OrderPayload::build(&OrderContext {
            user: user.as_ref(),
            cart,
            policy: &self.config.product_ids,
            currency: &self.config.currency,
            payment_method: draft.payment_method,
            address: &draft.address,
            coupon: coupon.as_ref(),
            totals: &totals,
        })
    }

    fn price(&self, draft: &OrderDraft, cart: &Cart) -> (OrderTotals, Option<AppliedCoupon>) {
        let subtotal = cart.subtotal();
        let coupon = draft
            .coupon_code
            .as_deref()
            .and_then(|code| self.config.coupons.resolve(code, subtotal));
        let totals = OrderTotals::compute(
            subtotal,
            coupon.as_ref(),
            draft.shipping.cost,
            self.config.tax_percent,
        );
        (totals, coupon)
    }

    async fn refresh_shipping(&self, state: &mut CheckoutState) {
        if !state.draft.shipping.needs_quote(&state.draft.address) {
            return;
        }
        let quoted = shipping::quote(
            &self.shipping,
            &state.draft.address,
            self.config.fallback_shipping,
        )
        .await;
        if quoted.is_quoted() || quoted.fallback {
            self.emit(CheckoutEvent::ShippingQuoted {
                cost: quoted.cost,
                method: quoted.details.as_ref().and_then(|d| d.method.clone()),
            });
        }
        state.draft.shipping = quoted;
    }

    async fn finalize_locked(&self, state: &mut CheckoutState) -> Result<()> {
        if !state.cart_cleared {
            self.cart.clear().await?;
            state.cart_cleared = true;
        }
        self.transition(state, CheckoutPhase::Complete);
        metrics::counter!("checkout_completed_total").increment(1);
        self.emit(CheckoutEvent::Completed {
            order_id: state.draft.remote_order_id.clone(),
        });
        Ok(())
    }

    /// Applies the empty-cart guard and returns the cart.
    async fn check_cart(&self, state: &mut CheckoutState) -> Result<Cart> {
        let cart = self.cart.snapshot().await;
        if state.phase == CheckoutPhase::Complete {
            return Ok(cart);
        }
        if cart.is_empty() {
            self.transition(state, CheckoutPhase::EmptyCart);
            return Err(CheckoutError::EmptyCart);
        }
        if state.phase == CheckoutPhase::EmptyCart {
            self.transition(state, CheckoutPhase::Address);
        }
        Ok(cart)
    }

    /// Guard for operations that change the draft.
    async fn editable(&self, state: &mut CheckoutState, action: &'static str) -> Result<Cart> {
        let cart = self.check_cart(state).await?;
        if !state.phase.is_editable() {
            return Err(CheckoutError::invalid_phase(action, state.phase));
        }
        Ok(cart)
    }

    fn transition(&self, state: &mut CheckoutState, to: CheckoutPhase) {
        let from = state.phase;
        if from == to {
            return;
        }
        metrics::histogram!("checkout_phase_duration_seconds", "phase" => from.as_str())
            .record(state.phase_entered.elapsed().as_secs_f64());
        state.phase = to;
        state.phase_entered = Instant::now();
        tracing::info!(from = %from, to = %to, "checkout phase changed");
        self.emit(CheckoutEvent::PhaseChanged { from, to });
    }

    fn emit(&self, event: CheckoutEvent) {
        tracing::trace!(event_type = event.event_type(), "checkout event");
        let _ = self.events.send(event);
    }
}

fn provider(method: PaymentMethod, source: backend::BackendError) -> CheckoutError {
    PaymentError::Provider { method, source }.into()
}
