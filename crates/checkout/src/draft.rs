use std::collections::BTreeSet;

use common::OrderId;
use domain::{AddressErrors, AddressField, FieldError, PaymentMethod, ShippingAddress};

use crate::payment::PaymentProgress;
use crate::shipping::ShippingState;

/// The checkout's working copy of the order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub address: ShippingAddress,
    /// Fields whose errors should be shown.
    pub touched: BTreeSet<AddressField>,
    /// Field the UI should focus after a failed submission.
    pub focus: Option<AddressField>,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub shipping: ShippingState,
    /// Set once the backend accepted the order; later saves patch it.
    pub remote_order_id: Option<OrderId>,
    pub payment: PaymentProgress,
}

impl OrderDraft {
    pub fn new(payment_method: PaymentMethod) -> Self {
        Self {
            address: ShippingAddress::default(),
            touched: BTreeSet::new(),
            focus: None,
            payment_method,
            coupon_code: None,
            shipping: ShippingState::default(),
            remote_order_id: None,
            payment: PaymentProgress::NotStarted,
        }
    }

    /// The error to display next to `field`, if it has been touched.
    pub fn field_error(&self, field: AddressField) -> Option<FieldError> {
        if !self.touched.contains(&field) {
            return None;
        }
        field.validate(self.address.field(field))
    }

    /// Marks every validated field touched and focuses the first invalid one.
    pub(crate) fn reveal_errors(&mut self, errors: &AddressErrors) {
        self.touched.extend(AddressField::REQUIRED);
        self.focus = errors.first_invalid();
    }
}
