use common::Money;
use serde::{Deserialize, Serialize};

use super::AppliedCoupon;

/// VAT applied to the discounted subtotal.
pub const TAX_RATE_PERCENT: u32 = 15;

/// Money breakdown of an order draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub tax: Money,
    pub grand_total: Money,
}

impl OrderTotals {
    /// Computes totals.
    ///
    /// Tax is `tax_percent` of `max(0, subtotal - discount)`. A coupon that
    /// waives shipping zeroes `shipping`.
    pub fn compute(
        subtotal: Money,
        coupon: Option<&AppliedCoupon>,
        shipping: Money,
        tax_percent: u32,
    ) -> Self {
        let discount = coupon.map(|c| c.discount).unwrap_or_default();
        let shipping = match coupon {
            Some(c) if c.waives_shipping => Money::zero(),
            _ => shipping.non_negative(),
        };
        let taxable = (subtotal - discount).non_negative();
        let tax = taxable.percentage(tax_percent);

        Self {
            subtotal,
            discount,
            shipping,
            tax,
            grand_total: taxable + tax + shipping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::CouponBook;

    #[test]
    fn save10_with_quoted_shipping() {
        let subtotal = Money::from_major(100);
        let coupon = CouponBook::default().resolve("SAVE10", subtotal);
        let totals = OrderTotals::compute(
            subtotal,
            coupon.as_ref(),
            Money::from_major(15),
            TAX_RATE_PERCENT,
        );

        assert_eq!(totals.discount, Money::from_major(10));
        assert_eq!(totals.tax, Money::from_cents(1350));
        assert_eq!(totals.grand_total, Money::from_cents(11850));
    }

    #[test]
    fn tax_never_negative_when_discount_exceeds_subtotal() {
        let coupon = AppliedCoupon {
            code: "BIG".into(),
            discount: Money::from_major(50),
            waives_shipping: false,
            recognized: true,
        };
        let totals =
            OrderTotals::compute(Money::from_major(20), Some(&coupon), Money::zero(), 15);
        assert!(totals.tax.is_zero());
        assert!(totals.grand_total.is_zero());
    }

    #[test]
    fn freeship_zeroes_shipping() {
        let subtotal = Money::from_major(40);
        let coupon = CouponBook::default().resolve("FREESHIP", subtotal);
        let totals =
            OrderTotals::compute(subtotal, coupon.as_ref(), Money::from_major(25), 15);
        assert!(totals.shipping.is_zero());
        assert_eq!(totals.grand_total, Money::from_major(46));
    }

    #[test]
    fn tax_rounds_to_nearest_minor_unit() {
        let totals = OrderTotals::compute(Money::from_cents(333), None, Money::zero(), 15);
        assert_eq!(totals.tax, Money::from_cents(50));
    }
}
