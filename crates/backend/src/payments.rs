//! Payment endpoints trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::OrderId;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{BackendError, Result};
use crate::idempotency::IdempotencyKey;
use crate::lock;
use crate::types::{
    BankDetails, BankInitResponse, PaypalCreateRequest, PaypalCreateResponse, ReceiptFile,
    ReceiptUploadResponse, StcConfirmRequest, StcConfirmResponse, StcCreateResponse,
};

/// Payment provider operations. Every call carries an idempotency key.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    /// Creates a PayPal order and returns the approval URL to redirect to.
    async fn paypal_create(
        &self,
        request: &PaypalCreateRequest,
        key: &IdempotencyKey,
    ) -> Result<PaypalCreateResponse>;

    /// Opens an STC Pay session for an order.
    async fn stc_create(&self, order_id: &OrderId, key: &IdempotencyKey)
    -> Result<StcCreateResponse>;

    /// Reports the outcome of an STC Pay session.
    async fn stc_confirm(
        &self,
        request: &StcConfirmRequest,
        key: &IdempotencyKey,
    ) -> Result<StcConfirmResponse>;

    /// Fetches the bank account and transfer reference for an order.
    async fn bank_init(&self, order_id: &OrderId, key: &IdempotencyKey)
    -> Result<BankInitResponse>;

    /// Attaches a proof-of-payment file to an order. May be repeated.
    async fn bank_upload_receipt(
        &self,
        order_id: &OrderId,
        receipt: ReceiptFile,
        key: &IdempotencyKey,
    ) -> Result<ReceiptUploadResponse>;

    /// Marks an order as cash on delivery.
    async fn cod_enable(&self, order_id: &OrderId, key: &IdempotencyKey) -> Result<()>;
}

/// Payment operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentOp {
    PaypalCreate,
    StcCreate,
    StcConfirm,
    BankInit,
    BankUpload,
    CodEnable,
}

impl PaymentOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOp::PaypalCreate => "paypal_create",
            PaymentOp::StcCreate => "stc_create",
            PaymentOp::StcConfirm => "stc_confirm",
            PaymentOp::BankInit => "bank_init",
            PaymentOp::BankUpload => "bank_upload",
            PaymentOp::CodEnable => "cod_enable",
        }
    }
}

/// A call received by [`InMemoryPaymentApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCall {
    pub op: PaymentOp,
    pub order_id: Option<OrderId>,
    pub key: IdempotencyKey,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    calls: Vec<PaymentCall>,
    responses: HashMap<(PaymentOp, IdempotencyKey), serde_json::Value>,
    stc_sessions: HashMap<OrderId, String>,
    stc_confirmations: Vec<(OrderId, bool)>,
    receipts: HashMap<OrderId, Vec<String>>,
    statuses: HashMap<OrderId, String>,
    failing: HashSet<PaymentOp>,
    omit_payloads: bool,
    next_id: u32,
}

impl InMemoryPaymentState {
    fn begin(&mut self, op: PaymentOp, order_id: Option<&OrderId>, key: &IdempotencyKey) {
        self.calls.push(PaymentCall {
            op,
            order_id: order_id.cloned(),
            key: key.clone(),
        });
    }

    fn replayed<T: DeserializeOwned>(&self, op: PaymentOp, key: &IdempotencyKey) -> Option<T> {
        self.responses
            .get(&(op, key.clone()))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    fn remember<T: Serialize>(
        &mut self,
        op: PaymentOp,
        key: &IdempotencyKey,
        response: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(response)?;
        self.responses.insert((op, key.clone()), value);
        Ok(())
    }

    fn check_failing(&self, op: PaymentOp) -> Result<()> {
        if self.failing.contains(&op) {
            return Err(BackendError::Unavailable(format!("{} failed", op.as_str())));
        }
        Ok(())
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory payment provider for testing.
///
/// A repeated idempotency key for the same operation returns the first
/// response without doing the work again.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentApi {
    state: Arc<Mutex<InMemoryPaymentState>>,
}

impl InMemoryPaymentApi {
    pub const BANK_ACCOUNT_NAME: &'static str = "Demo Trading Co.";
    pub const BANK_IBAN: &'static str = "SA03 8000 0000 6080 1016 7519";
    pub const BANK_NAME: &'static str = "Demo Bank";

    /// Creates a new in-memory payment provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures one operation to fail.
    pub fn set_failing(&self, op: PaymentOp, fail: bool) {
        let mut state = lock(&self.state);
        if fail {
            state.failing.insert(op);
        } else {
            state.failing.remove(&op);
        }
    }

    /// Configures successful responses to leave out their payload (approval
    /// URL, session id, bank details, receipt URL).
    pub fn set_omit_payloads(&self, omit: bool) {
        lock(&self.state).omit_payloads = omit;
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<PaymentCall> {
        lock(&self.state).calls.clone()
    }

    /// Returns the calls received for one operation.
    pub fn calls_for(&self, op: PaymentOp) -> Vec<PaymentCall> {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    /// Returns the STC confirmations received, in order.
    pub fn stc_confirmations(&self) -> Vec<(OrderId, bool)> {
        lock(&self.state).stc_confirmations.clone()
    }

    /// Returns the receipt URLs stored for an order, oldest first.
    pub fn receipts_for(&self, order_id: &OrderId) -> Vec<String> {
        lock(&self.state)
            .receipts
            .get(order_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the payment status recorded for an order.
    pub fn status_of(&self, order_id: &OrderId) -> Option<String> {
        lock(&self.state).statuses.get(order_id).cloned()
    }

    fn bank_reference(order_id: &OrderId) -> String {
        let prefix: String = order_id.as_str().chars().take(6).collect();
        format!("REF-{}", prefix.to_uppercase())
    }
}

#[async_trait]
impl PaymentApi for InMemoryPaymentApi {
    async fn paypal_create(
        &self,
        request: &PaypalCreateRequest,
        key: &IdempotencyKey,
    ) -> Result<PaypalCreateResponse> {
        let op = PaymentOp::PaypalCreate;
        let mut state = lock(&self.state);
        state.begin(op, request.local_order_id.as_ref(), key);
        if let Some(hit) = state.replayed(op, key) {
            return Ok(hit);
        }
        state.check_failing(op)?;

        let response = if state.omit_payloads {
            PaypalCreateResponse::default()
        } else {
            let token = format!("PP-{:04}", state.next());
            PaypalCreateResponse {
                approval_url: Some(format!(
                    "https://www.sandbox.paypal.com/checkoutnow?token={token}"
                )),
                paypal_order_id: Some(token),
            }
        };
        state.remember(op, key, &response)?;
        Ok(response)
    }

    async fn stc_create(
        &self,
        order_id: &OrderId,
        key: &IdempotencyKey,
    ) -> Result<StcCreateResponse> {
        let op = PaymentOp::StcCreate;
        let mut state = lock(&self.state);
        state.begin(op, Some(order_id), key);
        if let Some(hit) = state.replayed(op, key) {
            return Ok(hit);
        }
        state.check_failing(op)?;

        let response = if state.omit_payloads {
            StcCreateResponse::default()
        } else {
            let session_id = format!("STC-{}-{:04}", order_id, state.next());
            state
                .stc_sessions
                .insert(order_id.clone(), session_id.clone());
            StcCreateResponse {
                session_id: Some(session_id),
            }
        };
        state.remember(op, key, &response)?;
        Ok(response)
    }

    async fn stc_confirm(
        &self,
        request: &StcConfirmRequest,
        key: &IdempotencyKey,
    ) -> Result<StcConfirmResponse> {
        let op = PaymentOp::StcConfirm;
        let mut state = lock(&self.state);
        state.begin(op, Some(&request.order_id), key);
        if let Some(hit) = state.replayed(op, key) {
            return Ok(hit);
        }
        state.check_failing(op)?;

        if let Some(stored) = state.stc_sessions.get(&request.order_id)
            && *stored != request.session_id
        {
            return Err(BackendError::Status {
                status: 400,
                code: Some("SESSION_MISMATCH".to_string()),
                message: "session does not belong to this order".to_string(),
            });
        }

        let status = if request.success { "paid" } else { "cancelled" };
        state
            .stc_confirmations
            .push((request.order_id.clone(), request.success));
        state
            .statuses
            .insert(request.order_id.clone(), status.to_string());

        let response = StcConfirmResponse {
            status: status.to_string(),
            success: request.success,
        };
        state.remember(op, key, &response)?;
        Ok(response)
    }

    async fn bank_init(
        &self,
        order_id: &OrderId,
        key: &IdempotencyKey,
    ) -> Result<BankInitResponse> {
        let op = PaymentOp::BankInit;
        let mut state = lock(&self.state);
        state.begin(op, Some(order_id), key);
        if let Some(hit) = state.replayed(op, key) {
            return Ok(hit);
        }
        state.check_failing(op)?;

        let response = if state.omit_payloads {
            BankInitResponse::default()
        } else {
            state
                .statuses
                .insert(order_id.clone(), "pending_bank_review".to_string());
            BankInitResponse {
                bank: Some(BankDetails {
                    account_name: Self::BANK_ACCOUNT_NAME.to_string(),
                    iban: Self::BANK_IBAN.to_string(),
                    bank: Self::BANK_NAME.to_string(),
                    reference: Self::bank_reference(order_id),
                }),
            }
        };
        state.remember(op, key, &response)?;
        Ok(response)
    }

    async fn bank_upload_receipt(
        &self,
        order_id: &OrderId,
        receipt: ReceiptFile,
        key: &IdempotencyKey,
    ) -> Result<ReceiptUploadResponse> {
        let op = PaymentOp::BankUpload;
        let mut state = lock(&self.state);
        state.begin(op, Some(order_id), key);
        if let Some(hit) = state.replayed(op, key) {
            return Ok(hit);
        }
        state.check_failing(op)?;

        if receipt.bytes.is_empty() {
            return Err(BackendError::Status {
                status: 400,
                code: Some("NO_FILE".to_string()),
                message: "receipt file is empty".to_string(),
            });
        }

        let response = if state.omit_payloads {
            ReceiptUploadResponse::default()
        } else {
            let url = format!(
                "/uploads/bank-receipts/{}-{:04}-{}",
                order_id,
                state.next(),
                receipt.file_name
            );
            state
                .receipts
                .entry(order_id.clone())
                .or_default()
                .push(url.clone());
            ReceiptUploadResponse {
                receipt_url: Some(url),
            }
        };
        state.remember(op, key, &response)?;
        Ok(response)
    }

    async fn cod_enable(&self, order_id: &OrderId, key: &IdempotencyKey) -> Result<()> {
        let op = PaymentOp::CodEnable;
        let mut state = lock(&self.state);
        state.begin(op, Some(order_id), key);
        if state.replayed::<()>(op, key).is_some() {
            return Ok(());
        }
        state.check_failing(op)?;

        state
            .statuses
            .insert(order_id.clone(), "cod_pending".to_string());
        state.remember(op, key, &())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> OrderId {
        OrderId::new("ord_00000001")
    }

    #[tokio::test]
    async fn repeated_key_replays_first_response() {
        let api = InMemoryPaymentApi::new();
        let key = IdempotencyKey::generate();

        let first = api.stc_create(&order(), &key).await.unwrap();
        let second = api.stc_create(&order(), &key).await.unwrap();
        assert_eq!(first, second);

        let fresh = api
            .stc_create(&order(), &IdempotencyKey::generate())
            .await
            .unwrap();
        assert_ne!(first.session_id, fresh.session_id);
        assert_eq!(api.calls_for(PaymentOp::StcCreate).len(), 3);
    }

    #[tokio::test]
    async fn stc_confirm_checks_session() {
        let api = InMemoryPaymentApi::new();
        let session = api
            .stc_create(&order(), &IdempotencyKey::generate())
            .await
            .unwrap()
            .session_id
            .unwrap();

        let wrong = StcConfirmRequest {
            order_id: order(),
            session_id: "STC-other".into(),
            success: true,
        };
        let err = api
            .stc_confirm(&wrong, &IdempotencyKey::generate())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("SESSION_MISMATCH"));

        let failed = StcConfirmRequest {
            order_id: order(),
            session_id: session,
            success: false,
        };
        let response = api
            .stc_confirm(&failed, &IdempotencyKey::generate())
            .await
            .unwrap();
        assert_eq!(response.status, "cancelled");
        assert_eq!(api.stc_confirmations(), vec![(order(), false)]);
    }

    #[tokio::test]
    async fn bank_flow_accepts_repeated_receipts() {
        let api = InMemoryPaymentApi::new();
        let details = api
            .bank_init(&order(), &IdempotencyKey::generate())
            .await
            .unwrap()
            .bank
            .unwrap();
        assert_eq!(details.reference, "REF-ORD_00");
        assert_eq!(api.status_of(&order()).as_deref(), Some("pending_bank_review"));

        for name in ["first.jpg", "second.jpg"] {
            let file = ReceiptFile::new(name, "image/jpeg", vec![1, 2, 3]);
            api.bank_upload_receipt(&order(), file, &IdempotencyKey::generate())
                .await
                .unwrap();
        }
        let receipts = api.receipts_for(&order());
        assert_eq!(receipts.len(), 2);
        assert!(receipts[1].ends_with("second.jpg"));
    }

    #[tokio::test]
    async fn omitted_payloads_and_failures() {
        let api = InMemoryPaymentApi::new();
        api.set_omit_payloads(true);
        let request = PaypalCreateRequest {
            order: crate::types::PaypalOrder {
                total: common::Money::from_major(10),
                currency: "SAR".into(),
                items: Vec::new(),
            },
            local_order_id: Some(order()),
        };
        let response = api
            .paypal_create(&request, &IdempotencyKey::generate())
            .await
            .unwrap();
        assert!(response.approval_url.is_none());

        api.set_failing(PaymentOp::CodEnable, true);
        assert!(
            api.cod_enable(&order(), &IdempotencyKey::generate())
                .await
                .is_err()
        );
    }
}
