//! Checkout events, published to UI subscribers.

use common::{Money, OrderId};
use domain::{DomainEvent, PaymentMethod};
use serde::{Deserialize, Serialize};

use crate::phase::CheckoutPhase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum CheckoutEvent {
    PhaseChanged {
        from: CheckoutPhase,
        to: CheckoutPhase,
    },
    OrderCreated {
        order_id: OrderId,
    },
    OrderUpdated {
        order_id: OrderId,
    },
    ShippingQuoted {
        cost: Money,
        method: Option<String>,
    },
    CouponApplied {
        code: String,
        recognized: bool,
        discount: Money,
    },
    PaymentStarted {
        order_id: OrderId,
        method: PaymentMethod,
    },
    ReceiptUploaded {
        order_id: OrderId,
        receipt_url: String,
    },
    Completed {
        order_id: Option<OrderId>,
    },
}

impl DomainEvent for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::PhaseChanged { .. } => "PhaseChanged",
            CheckoutEvent::OrderCreated { .. } => "OrderCreated",
            CheckoutEvent::OrderUpdated { .. } => "OrderUpdated",
            CheckoutEvent::ShippingQuoted { .. } => "ShippingQuoted",
            CheckoutEvent::CouponApplied { .. } => "CouponApplied",
            CheckoutEvent::PaymentStarted { .. } => "PaymentStarted",
            CheckoutEvent::ReceiptUploaded { .. } => "ReceiptUploaded",
            CheckoutEvent::Completed { .. } => "Completed",
        }
    }
}
