//! The cart store.

use std::sync::Arc;

use backend::{BackendError, CartApi, MergeItem, RemoteCartItem, SkippedItem};
use common::{Money, ProductId, UserId};
use domain::{
    AddOutcome, AuthRequiredData, Cart, CartEvent, CartLineItem, DomainError, DomainEvent,
    ItemAddedData, MAX_PER_ITEM, MergeSkippedData, OldCartData, Product, QuantityChange,
    StockConflictData, SyncFailedData, adopt_remote, merge_max,
};
use secrecy::SecretString;
use storage::{StateStore, StateStoreExt, StorageError, keys};
use tokio::sync::{Mutex, broadcast};

use crate::config::CartConfig;
use crate::debounce::DebounceScheduler;
use crate::error::{CartError, Result};
use crate::session::Session;

/// Point-in-time copy of the store's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub cart: Cart,
    pub subtotal: Money,
    pub total_quantity: u32,
    pub error: Option<String>,
    pub loading: bool,
    pub has_old_cart_data: bool,
}

/// Outcome of the login merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Lines in the cart once the merge settled.
    pub lines: usize,
    /// Whether the merged cart was pushed to the backend.
    pub pushed: bool,
    pub skipped: Vec<SkippedItem>,
}

#[derive(Debug, Default)]
struct CartState {
    cart: Cart,
    error: Option<String>,
    loading: bool,
    old_cart: Option<Cart>,
    session: Session,
}

/// Which local quantity a stock-conflict rollback is measured against.
#[derive(Debug, Clone, Copy)]
enum RollbackBase {
    /// The line's quantity when the response arrives.
    Current,
    /// The quantity the request carried. Skipped once a newer edit has
    /// replaced it.
    Requested,
}

struct Inner<S, A> {
    config: CartConfig,
    storage: S,
    api: A,
    state: Mutex<CartState>,
    events: broadcast::Sender<CartEvent>,
    debounce: DebounceScheduler<ProductId>,
}

/// Shopper cart with optimistic local state and backend sync.
///
/// Clones share the same state. Construct one per application root and pass
/// it to whatever needs the cart.
pub struct CartStore<S, A> {
    inner: Arc<Inner<S, A>>,
}

impl<S, A> Clone for CartStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A> CartStore<S, A>
where
    S: StateStore + 'static,
    A: CartApi + 'static,
{
    /// Opens the store, reading the persisted cart once.
    ///
    /// A non-empty persisted cart is restored straight away when
    /// `config.auto_restore` is set; otherwise it is held back until
    /// [`restore_old_cart`](Self::restore_old_cart) or
    /// [`discard_old_cart`](Self::discard_old_cart) is called.
    pub async fn open(storage: S, api: A, config: CartConfig) -> Result<Self> {
        let persisted: Option<Cart> = match storage.load_state(keys::CART).await {
            Ok(cart) => cart,
            Err(StorageError::Serialization(e)) => {
                tracing::warn!(error = %e, "persisted cart unreadable, starting empty");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let mut state = CartState::default();
        match persisted.filter(|cart| !cart.is_empty()) {
            Some(cart) if config.auto_restore => {
                tracing::info!(lines = cart.len(), "restored persisted cart");
                state.cart = cart;
            }
            Some(cart) => state.old_cart = Some(cart),
            None => {}
        }

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let debounce = DebounceScheduler::new(config.debounce);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                storage,
                api,
                state: Mutex::new(state),
                events,
                debounce,
            }),
        })
    }

    /// Subscribes to cart events.
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &CartConfig {
        &self.inner.config
    }

    pub async fn view(&self) -> CartView {
        let state = self.inner.state.lock().await;
        CartView {
            cart: state.cart.clone(),
            subtotal: state.cart.subtotal(),
            total_quantity: state.cart.total_quantity(),
            error: state.error.clone(),
            loading: state.loading,
            has_old_cart_data: state.old_cart.is_some(),
        }
    }

    pub async fn cart(&self) -> Cart {
        self.inner.state.lock().await.cart.clone()
    }

    pub async fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.inner
            .state
            .lock()
            .await
            .cart
            .get(product_id)
            .map(CartLineItem::quantity)
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.state.lock().await.error.clone()
    }

    pub async fn clear_error(&self) {
        self.inner.state.lock().await.error = None;
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.state.lock().await.loading
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.lock().await.session.is_authenticated()
    }

    pub async fn user(&self) -> Option<UserId> {
        self.inner.state.lock().await.session.user.clone()
    }

    pub async fn has_merged(&self) -> bool {
        self.inner.state.lock().await.session.merged
    }

    /// Whether a cart from an earlier visit is waiting to be restored or discarded.
    pub async fn has_old_cart_data(&self) -> bool {
        self.inner.state.lock().await.old_cart.is_some()
    }

    /// Number of quantity edits waiting out their debounce window.
    pub fn pending_syncs(&self) -> usize {
        self.inner.debounce.pending_count()
    }

    /// Adds `quantity` units of `product` and syncs the resulting line
    /// quantity to the backend.
    ///
    /// Refused with [`CartError::AuthRequired`] when nobody is signed in; the
    /// cart is left untouched and an `AuthRequired` event is raised. Backend
    /// failures do not fail the add: a stock conflict rolls the line back,
    /// anything else is recorded in the error field.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: &Product, quantity: u32) -> Result<AddOutcome> {
        let outcome = {
            let mut state = self.inner.state.lock().await;
            if !state.session.is_authenticated() {
                self.inner.emit(CartEvent::AuthRequired(AuthRequiredData {
                    code: CartError::AUTH_REQUIRED.to_string(),
                    product_id: Some(product.id.clone()),
                }));
                tracing::info!("add refused, not signed in");
                return Err(CartError::AuthRequired);
            }

            let outcome = state.cart.add(product, quantity)?;
            self.inner.persist(&state.cart).await?;
            self.inner.emit(CartEvent::ItemAdded(ItemAddedData {
                product_id: product.id.clone(),
                name: product.display_name(self.inner.config.locale).to_string(),
                image: product.primary_image().map(str::to_string),
                quantity,
                kind: outcome.kind,
                line_quantity: outcome.quantity,
                unit_price: outcome.unit_price,
            }));
            outcome
        };

        // The add carries the newest quantity, so a waiting edit is stale.
        if self.inner.debounce.cancel(&product.id) {
            metrics::counter!("cart_sync_superseded_total").increment(1);
        }

        self.inner
            .sync_quantity(product.id.clone(), outcome.quantity, RollbackBase::Current)
            .await;
        Ok(outcome)
    }

    /// Sets a line's quantity locally and schedules a debounced sync.
    ///
    /// Zero or less removes the line. Values above the per-item limit are
    /// clamped. Only the last quantity set within the debounce window is sent.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<QuantityChange> {
        if quantity <= 0 {
            return match self.remove_from_cart(product_id).await? {
                Some(_) => Ok(QuantityChange::Removed),
                None => Err(DomainError::ItemNotFound {
                    product_id: product_id.clone(),
                }
                .into()),
            };
        }
        let quantity =
            u32::try_from(quantity.min(i64::from(MAX_PER_ITEM))).unwrap_or(MAX_PER_ITEM);

        let (change, authenticated) = {
            let mut state = self.inner.state.lock().await;
            let change = state.cart.set_quantity(product_id, quantity)?;
            self.inner.persist(&state.cart).await?;
            (change, state.session.is_authenticated())
        };

        if authenticated {
            let weak = Arc::downgrade(&self.inner);
            let id = product_id.clone();
            let superseded = self.inner.debounce.schedule(product_id.clone(), async move {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .sync_quantity(id, quantity, RollbackBase::Requested)
                        .await;
                }
            });
            if superseded {
                metrics::counter!("cart_sync_superseded_total").increment(1);
            }
        }

        Ok(change)
    }

    /// Removes a line. The local removal is final: a failed remote removal
    /// is recorded but never re-adds the line.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<Option<CartLineItem>> {
        self.inner.debounce.cancel(product_id);

        let (removed, authenticated) = {
            let mut state = self.inner.state.lock().await;
            let removed = state.cart.remove(product_id);
            if removed.is_some() {
                self.inner.persist(&state.cart).await?;
            }
            (removed, state.session.is_authenticated())
        };

        if authenticated && removed.is_some() {
            match self.inner.api.remove_item(product_id).await {
                Ok(()) | Err(BackendError::NotFound { .. }) => {}
                Err(e) => self.inner.record_failure(Some(product_id.clone()), &e).await,
            }
        }
        Ok(removed)
    }

    /// Empties the cart locally and, when signed in, remotely.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<()> {
        let cancelled = self.inner.debounce.cancel_all();
        if cancelled > 0 {
            tracing::debug!(cancelled, "pending syncs dropped by clear");
        }

        let authenticated = {
            let mut state = self.inner.state.lock().await;
            state.cart.clear();
            self.inner.persist(&state.cart).await?;
            self.inner.emit(CartEvent::Cleared);
            state.session.is_authenticated()
        };

        if authenticated {
            if let Err(e) = self.inner.api.clear().await {
                self.inner.record_failure(None, &e).await;
            }
        }
        Ok(())
    }

    /// Records a sign-in and runs the login merge if it has not run yet
    /// this session.
    ///
    /// A credential is handed to the backend client before anything is
    /// sent. The merge needs one and runs after `config.merge_delay`.
    /// Returns `None` when no merge ran.
    #[tracing::instrument(skip(self, user, credential), fields(user_id = %user))]
    pub async fn sign_in(
        &self,
        user: UserId,
        credential: Option<SecretString>,
    ) -> Result<Option<MergeReport>> {
        {
            let mut state = self.inner.state.lock().await;
            state.session.user = Some(user);
            if credential.is_some() {
                self.inner.api.set_credential(credential.clone());
                state.session.credential = credential;
            }
            if !state.session.can_sync() || state.session.merged {
                return Ok(None);
            }
            state.session.merged = true;
        }

        tokio::time::sleep(self.inner.config.merge_delay).await;
        self.inner.merge_with_server().await.map(Some)
    }

    /// Ends the session. The local cart is kept; the merge latch is reset.
    #[tracing::instrument(skip(self))]
    pub async fn sign_out(&self) {
        self.inner.debounce.cancel_all();
        self.inner.api.set_credential(None);
        self.inner.state.lock().await.session = Session::default();
    }

    /// Replaces the cart with the one persisted by an earlier visit.
    /// Returns the number of lines restored.
    #[tracing::instrument(skip(self))]
    pub async fn restore_old_cart(&self) -> Result<usize> {
        let mut state = self.inner.state.lock().await;
        let Some(old) = state.old_cart.take() else {
            return Ok(0);
        };

        state.cart = Cart::hydrate(Vec::from(old));
        self.inner.persist(&state.cart).await?;
        let line_count = state.cart.len();
        self.inner
            .emit(CartEvent::OldCartRestored(OldCartData { line_count }));
        Ok(line_count)
    }

    /// Drops the cart persisted by an earlier visit.
    #[tracing::instrument(skip(self))]
    pub async fn discard_old_cart(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let Some(old) = state.old_cart.take() else {
            return Ok(());
        };

        self.inner.storage.remove(keys::CART).await?;
        if !state.cart.is_empty() {
            self.inner.persist(&state.cart).await?;
        }
        self.inner
            .emit(CartEvent::OldCartDiscarded(OldCartData {
                line_count: old.len(),
            }));
        Ok(())
    }

    /// Aborts every pending debounced sync, e.g. when the owning view goes away.
    pub fn shutdown(&self) {
        self.inner.debounce.cancel_all();
    }
}

impl<S, A> Inner<S, A>
where
    S: StateStore,
    A: CartApi,
{
    fn emit(&self, event: CartEvent) {
        tracing::trace!(event_type = event.event_type(), "cart event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn persist(&self, cart: &Cart) -> Result<()> {
        self.storage.save_state(keys::CART, cart).await?;
        Ok(())
    }

    async fn record_failure(&self, product_id: Option<ProductId>, error: &BackendError) {
        tracing::warn!(error = %error, product_id = ?product_id, "cart sync failed");
        let message = error.to_string();
        self.state.lock().await.error = Some(message.clone());
        self.emit(CartEvent::SyncFailed(SyncFailedData {
            product_id,
            message,
        }));
    }

    /// Sends an absolute quantity and applies a stock-conflict rollback if
    /// the backend has fewer units.
    async fn sync_quantity(&self, product_id: ProductId, quantity: u32, base: RollbackBase) {
        metrics::counter!("cart_sync_requests_total").increment(1);

        let error = match self.api.set_quantity(&product_id, quantity).await {
            Ok(()) => {
                tracing::debug!(product_id = %product_id, quantity, "quantity synced");
                return;
            }
            Err(e) => e,
        };

        let Some(available) = error.available() else {
            self.record_failure(Some(product_id), &error).await;
            return;
        };

        metrics::counter!("cart_stock_conflicts_total").increment(1);
        let mut state = self.state.lock().await;
        let current = state.cart.get(&product_id).map(CartLineItem::quantity);
        let reference = match base {
            RollbackBase::Requested => {
                // A newer edit owns the line now and carries its own sync.
                if self.debounce.is_pending(&product_id) || current != Some(quantity) {
                    tracing::debug!(
                        product_id = %product_id,
                        requested = quantity,
                        available,
                        "stock conflict for a superseded quantity, keeping newer edit"
                    );
                    return;
                }
                current.map(|current| current.min(quantity))
            }
            RollbackBase::Current => current,
        };
        let Some(reference) = reference else {
            return;
        };
        let Some(change) = state.cart.apply_stock_limit(&product_id, available, reference) else {
            return;
        };

        let after = match change {
            QuantityChange::Updated { quantity, .. } => quantity,
            QuantityChange::Removed => 0,
        };
        if let Err(e) = self.persist(&state.cart).await {
            tracing::warn!(error = %e, "failed to persist rollback");
        }
        state.error = Some(format!("Only {available} left in stock"));
        tracing::warn!(
            product_id = %product_id,
            requested = quantity,
            available,
            rolled_back_to = after,
            "stock conflict"
        );
        self.emit(CartEvent::StockConflict(StockConflictData {
            product_id,
            requested: quantity,
            available,
            quantity: after,
        }));
    }

    #[tracing::instrument(skip(self))]
    async fn merge_with_server(&self) -> Result<MergeReport> {
        {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.error = None;
        }

        let result = self.run_merge().await;

        let mut state = self.state.lock().await;
        state.loading = false;
        if let Err(e) = &result {
            state.error = Some(e.to_string());
        }
        result
    }

    async fn run_merge(&self) -> Result<MergeReport> {
        let remote = match self.api.list().await {
            Ok(items) => items,
            Err(e) => {
                // Let a later sign-in retry.
                self.state.lock().await.session.merged = false;
                tracing::warn!(error = %e, "login merge could not fetch server cart");
                return Err(e.into());
            }
        };

        let (merged, push) = {
            let mut state = self.state.lock().await;
            let push = !state.cart.is_empty();
            state.cart = merge_max(&state.cart, into_lines(remote));
            self.persist(&state.cart).await?;
            (state.cart.clone(), push)
        };

        let mut report = MergeReport {
            lines: merged.len(),
            pushed: false,
            skipped: Vec::new(),
        };
        metrics::counter!("cart_merges_total").increment(1);
        if !push {
            return Ok(report);
        }

        let items: Vec<MergeItem> = merged
            .quantities()
            .map(|(product_id, quantity)| MergeItem {
                product_id: product_id.clone(),
                quantity,
            })
            .collect();

        match self.api.merge(items).await {
            Ok(response) => {
                report.pushed = true;
                if !response.skipped.is_empty() {
                    tracing::warn!(count = response.skipped.len(), "merge skipped lines");
                    self.emit(CartEvent::MergeSkipped(MergeSkippedData {
                        count: response.skipped.len(),
                        product_ids: response
                            .skipped
                            .iter()
                            .map(|s| s.product_id.clone())
                            .collect(),
                    }));
                }
                report.skipped = response.skipped;
            }
            Err(e) => tracing::warn!(error = %e, "merge push failed"),
        }

        match self.api.list().await {
            Ok(fresh) => {
                let mut state = self.state.lock().await;
                state.cart = adopt_remote(&state.cart, into_lines(fresh));
                self.persist(&state.cart).await?;
                report.lines = state.cart.len();
            }
            Err(e) => tracing::warn!(error = %e, "refetch after merge failed"),
        }

        tracing::info!(lines = report.lines, skipped = report.skipped.len(), "login merge done");
        Ok(report)
    }
}

fn into_lines(items: Vec<RemoteCartItem>) -> Vec<CartLineItem> {
    items
        .into_iter()
        .map(RemoteCartItem::into_line_item)
        .collect()
}
