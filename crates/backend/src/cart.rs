//! Remote cart trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{Money, ProductId};
use secrecy::SecretString;

use crate::error::{BackendError, Result};
use crate::lock;
use crate::types::{MergeItem, MergeResponse, RemoteCartItem, SkippedItem};

/// Operations on the signed-in user's server-side cart.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetches the current cart.
    async fn list(&self) -> Result<Vec<RemoteCartItem>>;

    /// Sets the absolute quantity of one product. Zero removes it.
    async fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Removes one product.
    async fn remove_item(&self, product_id: &ProductId) -> Result<()>;

    /// Empties the cart.
    async fn clear(&self) -> Result<()>;

    /// Pushes a batch of absolute quantities, returning the resulting cart
    /// and the lines that could not be carried over.
    async fn merge(&self, items: Vec<MergeItem>) -> Result<MergeResponse>;

    /// Replaces the credential sent with later calls. `None` on sign-out.
    fn set_credential(&self, _credential: Option<SecretString>) {}
}

/// A call received by [`InMemoryCartApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCall {
    List,
    Set { product_id: ProductId, quantity: u32 },
    Remove(ProductId),
    Clear,
    Merge(Vec<MergeItem>),
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    /// Cart lines in insertion order.
    lines: Vec<(ProductId, u32)>,
    /// Unreserved units per product. Products without an entry are unlimited.
    stock: HashMap<ProductId, u32>,
    prices: HashMap<ProductId, Money>,
    calls: Vec<CartCall>,
    fail_all: bool,
    latency: Option<Duration>,
    credential: Option<SecretString>,
}

impl InMemoryCartState {
    fn current(&self, id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|(pid, _)| pid == id)
            .map(|(_, q)| *q)
            .unwrap_or(0)
    }

    fn put(&mut self, id: &ProductId, quantity: u32) {
        let index = self.lines.iter().position(|(pid, _)| pid == id);
        match (index, quantity) {
            (Some(i), 0) => {
                self.lines.remove(i);
            }
            (Some(i), q) => self.lines[i].1 = q,
            (None, 0) => {}
            (None, q) => self.lines.push((id.clone(), q)),
        }
    }

    fn restock(&mut self, id: &ProductId, units: u32) {
        if let Some(stock) = self.stock.get_mut(id) {
            *stock += units;
        }
    }

    /// Reserves up to `wanted` units and returns how many were granted.
    fn reserve(&mut self, id: &ProductId, wanted: u32) -> u32 {
        match self.stock.get_mut(id) {
            Some(stock) => {
                let granted = wanted.min(*stock);
                *stock -= granted;
                granted
            }
            None => wanted,
        }
    }

    fn available(&self, id: &ProductId) -> Option<u32> {
        self.stock.get(id).copied()
    }

    fn snapshot(&self) -> Vec<RemoteCartItem> {
        self.lines
            .iter()
            .map(|(id, quantity)| {
                let mut item = RemoteCartItem::new(id.clone(), *quantity);
                item.price = self.prices.get(id).copied();
                item
            })
            .collect()
    }
}

/// In-memory cart backend for testing.
///
/// Stock is reserved when quantities grow and returned when they shrink, the
/// way the storefront backend does it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartApi {
    state: Arc<Mutex<InMemoryCartState>>,
}

impl InMemoryCartApi {
    /// Creates a new in-memory cart backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the unreserved stock of a product.
    pub fn set_stock(&self, product_id: impl Into<ProductId>, units: u32) {
        lock(&self.state).stock.insert(product_id.into(), units);
    }

    /// Sets the price reported for a product in cart listings.
    pub fn set_price(&self, product_id: impl Into<ProductId>, price: Money) {
        lock(&self.state).prices.insert(product_id.into(), price);
    }

    /// Seeds a server-side cart line without touching stock.
    pub fn seed_line(&self, product_id: impl Into<ProductId>, quantity: u32) {
        lock(&self.state).put(&product_id.into(), quantity);
    }

    /// Configures every call to fail.
    pub fn set_fail_all(&self, fail: bool) {
        lock(&self.state).fail_all = fail;
    }

    /// Delays every response by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        lock(&self.state).latency = latency;
    }

    /// Whether a credential is currently set.
    pub fn has_credential(&self) -> bool {
        lock(&self.state).credential.is_some()
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<CartCall> {
        lock(&self.state).calls.clone()
    }

    /// Returns the quantities sent to `set_quantity` for one product.
    pub fn set_calls_for(&self, product_id: &ProductId) -> Vec<u32> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                CartCall::Set {
                    product_id: id,
                    quantity,
                } if id == product_id => Some(*quantity),
                _ => None,
            })
            .collect()
    }

    /// Returns the server-side quantity of a product.
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        lock(&self.state).current(product_id)
    }

    /// Returns the unreserved stock of a product, if it is limited.
    pub fn stock_of(&self, product_id: &ProductId) -> Option<u32> {
        lock(&self.state).available(product_id)
    }

    async fn begin(&self, call: CartCall) -> Result<()> {
        let latency = {
            let mut state = lock(&self.state);
            state.calls.push(call);
            if state.fail_all {
                return Err(BackendError::Unavailable("cart service down".to_string()));
            }
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait]
impl CartApi for InMemoryCartApi {
    async fn list(&self) -> Result<Vec<RemoteCartItem>> {
        self.begin(CartCall::List).await?;
        Ok(lock(&self.state).snapshot())
    }

    async fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        self.begin(CartCall::Set {
            product_id: product_id.clone(),
            quantity,
        })
        .await?;

        let mut state = lock(&self.state);
        let current = state.current(product_id);

        if quantity > current {
            let delta = quantity - current;
            if let Some(unreserved) = state.available(product_id)
                && unreserved < delta
            {
                // Report the most this line can hold, not just the spare units.
                return Err(BackendError::InsufficientStock {
                    available: current + unreserved,
                });
            }
            state.reserve(product_id, delta);
        } else {
            state.restock(product_id, current - quantity);
        }
        state.put(product_id, quantity);
        Ok(())
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<()> {
        self.begin(CartCall::Remove(product_id.clone())).await?;

        let mut state = lock(&self.state);
        let current = state.current(product_id);
        if current == 0 {
            return Err(BackendError::NotFound {
                resource: format!("cart item {product_id}"),
            });
        }
        state.restock(product_id, current);
        state.put(product_id, 0);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.begin(CartCall::Clear).await?;

        let mut state = lock(&self.state);
        let lines = std::mem::take(&mut state.lines);
        for (id, quantity) in lines {
            state.restock(&id, quantity);
        }
        Ok(())
    }

    async fn merge(&self, items: Vec<MergeItem>) -> Result<MergeResponse> {
        self.begin(CartCall::Merge(items.clone())).await?;

        let mut state = lock(&self.state);
        let mut skipped = Vec::new();
        for item in items {
            if item.product_id.is_blank() || item.quantity == 0 {
                continue;
            }
            let current = state.current(&item.product_id);
            let wanted = item.quantity.saturating_sub(current);
            let granted = state.reserve(&item.product_id, wanted);
            let final_quantity = current + granted;
            if final_quantity == 0 {
                skipped.push(SkippedItem {
                    product_id: item.product_id,
                    reason: "OUT_OF_STOCK".to_string(),
                });
                continue;
            }
            state.put(&item.product_id, final_quantity);
        }

        Ok(MergeResponse {
            items: state.snapshot(),
            skipped,
        })
    }

    fn set_credential(&self, credential: Option<SecretString>) {
        lock(&self.state).credential = credential;
    }
}
