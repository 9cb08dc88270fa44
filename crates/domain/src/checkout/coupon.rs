use std::collections::HashMap;

use common::Money;
use serde::{Deserialize, Serialize};

/// How a coupon code changes the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRule {
    /// `percent` of the subtotal, never more than `cap`.
    PercentCapped { percent: u32, cap: Money },
    /// Shipping is free; the subtotal is untouched.
    FreeShipping,
}

impl CouponRule {
    fn discount(&self, subtotal: Money) -> Money {
        match self {
            CouponRule::PercentCapped { percent, cap } => {
                subtotal.non_negative().percentage(*percent).min(*cap)
            }
            CouponRule::FreeShipping => Money::zero(),
        }
    }

    fn waives_shipping(&self) -> bool {
        matches!(self, CouponRule::FreeShipping)
    }
}

/// A coupon the shopper applied, with its computed effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    /// Code as the shopper typed it, trimmed.
    pub code: String,
    pub discount: Money,
    pub waives_shipping: bool,
    /// False when the code matched no rule; it still counts as applied.
    pub recognized: bool,
}

impl AppliedCoupon {
    pub fn has_effect(&self) -> bool {
        self.discount.is_positive() || self.waives_shipping
    }
}

/// Table of known coupon codes, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct CouponBook {
    rules: HashMap<String, CouponRule>,
}

impl Default for CouponBook {
    fn default() -> Self {
        CouponBook::empty()
            .with_rule(
                "SAVE10",
                CouponRule::PercentCapped {
                    percent: 20,
                    cap: Money::from_major(10),
                },
            )
            .with_rule(
                "SAVE20",
                CouponRule::PercentCapped {
                    percent: 30,
                    cap: Money::from_major(20),
                },
            )
            .with_rule("FREESHIP", CouponRule::FreeShipping)
    }
}

impl CouponBook {
    /// A book with no codes at all.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, code: &str, rule: CouponRule) -> Self {
        self.rules.insert(normalize(code), rule);
        self
    }

    pub fn rule(&self, code: &str) -> Option<&CouponRule> {
        self.rules.get(&normalize(code))
    }

    /// Resolves `code` against `subtotal`. Blank codes resolve to nothing;
    /// unknown codes resolve to an applied coupon with no effect.
    pub fn resolve(&self, code: &str, subtotal: Money) -> Option<AppliedCoupon> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return None;
        }

        let applied = match self.rule(trimmed) {
            Some(rule) => AppliedCoupon {
                code: trimmed.to_string(),
                discount: rule.discount(subtotal),
                waives_shipping: rule.waives_shipping(),
                recognized: true,
            },
            None => AppliedCoupon {
                code: trimmed.to_string(),
                discount: Money::zero(),
                waives_shipping: false,
                recognized: false,
            },
        };
        Some(applied)
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
