//! Checkout error types.
//!
//! Display strings are shown to the shopper; diagnostic detail stays in the
//! source error and the logs.

use backend::BackendError;
use cart::CartError;
use domain::{AddressErrors, PaymentMethod};
use storage::StorageError;
use thiserror::Error;

use crate::phase::CheckoutPhase;

/// Errors raised by a payment sub-protocol.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("PayPal did not return an approval link")]
    MissingApprovalUrl,

    #[error("STC Pay did not return a session")]
    MissingSessionId,

    #[error("Bank transfer details are not available")]
    MissingBankDetails,

    #[error("The receipt upload was not accepted")]
    MissingReceiptUrl,

    #[error("There is no STC Pay session to confirm")]
    NoStcSession,

    #[error("Bank transfer has not been started")]
    NoBankTransfer,

    #[error("The receipt file is empty")]
    EmptyReceipt,

    #[error("{0} payments are not available")]
    MethodDisabled(PaymentMethod),

    /// The provider call itself failed.
    #[error("{method} payment could not be processed, please try again")]
    Provider {
        method: PaymentMethod,
        #[source]
        source: BackendError,
    },
}

/// Errors returned by checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    /// One or more address fields are invalid.
    #[error("Please correct the highlighted address fields ({0})")]
    InvalidAddress(AddressErrors),

    #[error("Cannot {action} during the {phase} step")]
    InvalidPhase {
        action: &'static str,
        phase: CheckoutPhase,
    },

    /// Creating or updating the remote order failed.
    #[error("We could not save your order right now, please try again")]
    OrderFailed(#[source] BackendError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CheckoutError {
    pub(crate) fn invalid_phase(action: &'static str, phase: CheckoutPhase) -> Self {
        CheckoutError::InvalidPhase { action, phase }
    }
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
