//! Remote order trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::OrderId;
use domain::{OrderPatch, OrderPayload};

use crate::error::{BackendError, Result};
use crate::lock;

/// Order resource operations.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Creates an order and returns its id.
    async fn create(&self, payload: &OrderPayload) -> Result<OrderId>;

    /// Updates the items, payment method and checkout details of an order.
    async fn patch(&self, order_id: &OrderId, patch: &OrderPatch) -> Result<()>;
}

/// An order as held by [`InMemoryOrderApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub payload: OrderPayload,
    pub status: String,
    pub patches: usize,
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, StoredOrder>,
    next_id: u32,
    create_calls: usize,
    patch_calls: usize,
    fail_on_create: bool,
    reject_patches: bool,
}

/// In-memory order backend for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderApi {
    state: Arc<Mutex<InMemoryOrderState>>,
}

impl InMemoryOrderApi {
    /// Creates a new in-memory order backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures create calls to fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        lock(&self.state).fail_on_create = fail;
    }

    /// Configures patch calls to be rejected, as for an order that can no
    /// longer be edited.
    pub fn set_reject_patches(&self, reject: bool) {
        lock(&self.state).reject_patches = reject;
    }

    /// Returns how many create calls were received.
    pub fn create_calls(&self) -> usize {
        lock(&self.state).create_calls
    }

    /// Returns how many patch calls were received.
    pub fn patch_calls(&self) -> usize {
        lock(&self.state).patch_calls
    }

    /// Returns the number of stored orders.
    pub fn order_count(&self) -> usize {
        lock(&self.state).orders.len()
    }

    pub fn get(&self, order_id: &OrderId) -> Option<StoredOrder> {
        lock(&self.state).orders.get(order_id).cloned()
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        lock(&self.state).orders.contains_key(order_id)
    }

    /// Moves an order to a new status, e.g. after a payment step.
    pub fn set_status(&self, order_id: &OrderId, status: &str) -> Result<()> {
        let mut state = lock(&self.state);
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| not_found(order_id))?;
        order.status = status.to_string();
        Ok(())
    }
}

fn not_found(order_id: &OrderId) -> BackendError {
    BackendError::NotFound {
        resource: format!("order {order_id}"),
    }
}

#[async_trait]
impl OrderApi for InMemoryOrderApi {
    async fn create(&self, payload: &OrderPayload) -> Result<OrderId> {
        let mut state = lock(&self.state);
        state.create_calls += 1;

        if state.fail_on_create {
            return Err(BackendError::Status {
                status: 500,
                code: Some("ORDER_CREATE_FAILED".to_string()),
                message: "could not create order".to_string(),
            });
        }
        if payload.items.is_empty() {
            return Err(BackendError::Status {
                status: 400,
                code: Some("EMPTY_ORDER".to_string()),
                message: "order has no items".to_string(),
            });
        }

        state.next_id += 1;
        let order_id = OrderId::new(format!("ord_{:08}", state.next_id));
        state.orders.insert(
            order_id.clone(),
            StoredOrder {
                payload: payload.clone(),
                status: "pending".to_string(),
                patches: 0,
            },
        );
        Ok(order_id)
    }

    async fn patch(&self, order_id: &OrderId, patch: &OrderPatch) -> Result<()> {
        let mut state = lock(&self.state);
        state.patch_calls += 1;

        if state.reject_patches {
            return Err(BackendError::Status {
                status: 403,
                code: Some("ORDER_LOCKED".to_string()),
                message: "order can no longer be edited".to_string(),
            });
        }

        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| not_found(order_id))?;
        order.payload.items = patch.items.clone();
        order.payload.payment_method = patch.payment_method;
        order.payload.payment_meta = patch.payment_meta.clone();
        order.patches += 1;
        Ok(())
    }
}
