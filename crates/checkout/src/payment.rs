use backend::BankDetails;
use serde::{Deserialize, Serialize};

/// How far the selected payment sub-protocol has got.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PaymentProgress {
    #[default]
    NotStarted,
    /// The shopper was sent to PayPal; capture happens outside the app.
    AwaitingPaypalApproval {
        approval_url: String,
        paypal_order_id: Option<String>,
    },
    StcSession {
        session_id: String,
    },
    BankTransfer {
        details: BankDetails,
        receipts: Vec<String>,
    },
    CashOnDelivery,
}

/// What the UI should do after a payment was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStart {
    /// Navigate away to PayPal.
    Redirect { approval_url: String },
    /// Show the STC Pay confirm/cancel controls.
    StcSession { session_id: String },
    /// Show the account details and the receipt upload.
    BankTransfer(BankDetails),
    /// Nothing left to do; the checkout is complete.
    Completed,
}

/// Result of an STC Pay confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StcOutcome {
    Paid,
    Declined { status: String },
}
