//! Checkout phase state machine.

use serde::{Deserialize, Serialize};

/// The phase a checkout is in.
///
/// Phase transitions:
/// ```text
/// Address ──► Payment ──► Review ──► RealPayment ──► Complete
///    ▲           │          │             │
///    └───────────┴──────────┴─────────────┘  (edit address / back)
///
/// any non-complete phase ──► EmptyCart  (cart became empty)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    /// Collecting the shipping address.
    #[default]
    Address,

    /// Choosing a payment method, coupon and shipping.
    Payment,

    /// Read-only summary before paying.
    Review,

    /// Running a payment sub-protocol.
    RealPayment,

    /// Order placed (terminal state).
    Complete,

    /// Nothing to check out (terminal until the cart is refilled).
    EmptyCart,
}

impl CheckoutPhase {
    pub fn can_submit_address(&self) -> bool {
        matches!(self, CheckoutPhase::Address)
    }

    pub fn can_advance_to_review(&self) -> bool {
        matches!(self, CheckoutPhase::Payment)
    }

    pub fn can_open_real_payment(&self) -> bool {
        matches!(self, CheckoutPhase::Review)
    }

    pub fn can_pay(&self) -> bool {
        matches!(self, CheckoutPhase::RealPayment)
    }

    /// Returns true if the address and order draft may still change.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            CheckoutPhase::Address
                | CheckoutPhase::Payment
                | CheckoutPhase::Review
                | CheckoutPhase::RealPayment
        )
    }

    /// The phase `back` returns to.
    pub fn previous(&self) -> Option<CheckoutPhase> {
        match self {
            CheckoutPhase::RealPayment => Some(CheckoutPhase::Review),
            CheckoutPhase::Review => Some(CheckoutPhase::Payment),
            CheckoutPhase::Payment => Some(CheckoutPhase::Address),
            _ => None,
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::Complete | CheckoutPhase::EmptyCart)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutPhase::Address => "address",
            CheckoutPhase::Payment => "payment",
            CheckoutPhase::Review => "review",
            CheckoutPhase::RealPayment => "real_payment",
            CheckoutPhase::Complete => "complete",
            CheckoutPhase::EmptyCart => "empty_cart",
        }
    }
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CheckoutPhase; 6] = [
        CheckoutPhase::Address,
        CheckoutPhase::Payment,
        CheckoutPhase::Review,
        CheckoutPhase::RealPayment,
        CheckoutPhase::Complete,
        CheckoutPhase::EmptyCart,
    ];

    #[test]
    fn test_default_phase_is_address() {
        assert_eq!(CheckoutPhase::default(), CheckoutPhase::Address);
    }

    #[test]
    fn test_each_forward_step_has_one_source() {
        let count = |f: fn(&CheckoutPhase) -> bool| ALL.iter().filter(|p| f(p)).count();
        assert_eq!(count(CheckoutPhase::can_submit_address), 1);
        assert_eq!(count(CheckoutPhase::can_advance_to_review), 1);
        assert_eq!(count(CheckoutPhase::can_open_real_payment), 1);
        assert_eq!(count(CheckoutPhase::can_pay), 1);
    }

    #[test]
    fn test_back_walks_towards_address() {
        let mut phase = CheckoutPhase::RealPayment;
        let mut visited = vec![phase];
        while let Some(previous) = phase.previous() {
            phase = previous;
            visited.push(phase);
        }
        assert_eq!(
            visited,
            vec![
                CheckoutPhase::RealPayment,
                CheckoutPhase::Review,
                CheckoutPhase::Payment,
                CheckoutPhase::Address
            ]
        );
        assert_eq!(CheckoutPhase::Complete.previous(), None);
    }

    #[test]
    fn test_terminal_states() {
        for phase in ALL {
            assert_eq!(phase.is_terminal(), !phase.is_editable(), "{phase}");
        }
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&CheckoutPhase::RealPayment).unwrap();
        assert_eq!(json, "\"real_payment\"");
        let back: CheckoutPhase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CheckoutPhase::RealPayment);
    }
}
