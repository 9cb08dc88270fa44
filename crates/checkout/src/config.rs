use common::Money;
use domain::{CouponBook, PaymentMethod, ProductIdPolicy, TAX_RATE_PERCENT};

/// Checkout settings.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub currency: String,
    pub tax_percent: u32,
    /// Shipping charged when no quote can be obtained.
    pub fallback_shipping: Money,
    pub product_ids: ProductIdPolicy,
    pub coupons: CouponBook,
    /// Payment methods the shopper may pick, in display order.
    pub enabled_methods: Vec<PaymentMethod>,
}

impl CheckoutConfig {
    /// Default settings with every payment method enabled.
    pub fn all_methods() -> Self {
        Self {
            enabled_methods: PaymentMethod::ALL.to_vec(),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, method: PaymentMethod) -> bool {
        self.enabled_methods.contains(&method)
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: "SAR".to_string(),
            tax_percent: TAX_RATE_PERCENT,
            fallback_shipping: Money::from_major(25),
            product_ids: ProductIdPolicy::default(),
            coupons: CouponBook::default(),
            enabled_methods: vec![PaymentMethod::Cod, PaymentMethod::Bank],
        }
    }
}
