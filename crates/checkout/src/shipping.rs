//! Shipping quote state for the draft.

use backend::{QuoteAddress, ShippingApi, ShippingQuote, ShippingQuoteRequest};
use common::Money;
use domain::ShippingAddress;
use serde::{Deserialize, Serialize};

/// Metadata from a successful quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetails {
    pub method: Option<String>,
    pub distance_km: Option<f64>,
    pub city_matched: Option<String>,
    /// Delivery window in hours, for nearby destinations.
    pub eta_hours: Option<(u32, u32)>,
    /// Delivery window in days.
    pub eta_days: Option<(u32, u32)>,
}

impl From<ShippingQuote> for QuoteDetails {
    fn from(quote: ShippingQuote) -> Self {
        Self {
            method: quote.method,
            distance_km: quote.distance_km,
            city_matched: quote.city_matched,
            eta_hours: quote.eta_hours_min.zip(quote.eta_hours_max),
            eta_days: quote.eta_days_min.zip(quote.eta_days_max),
        }
    }
}

/// Shipping cost of the draft and where it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShippingState {
    pub cost: Money,
    /// Present only when the quoting service answered.
    pub details: Option<QuoteDetails>,
    /// The fixed fallback cost is in use.
    pub fallback: bool,
    quoted_for: Option<QuoteAddress>,
}

impl ShippingState {
    /// Returns true if the destination changed since the last quote.
    pub fn needs_quote(&self, address: &ShippingAddress) -> bool {
        self.quoted_for.as_ref() != Some(&destination(address))
    }

    pub fn is_quoted(&self) -> bool {
        self.details.is_some()
    }
}

fn destination(address: &ShippingAddress) -> QuoteAddress {
    QuoteAddress {
        city: address.city.trim().to_string(),
        country: address.country.trim().to_string(),
        geo: address.geo,
    }
}

/// Quotes shipping for `address`.
///
/// An empty city is not quotable yet and costs nothing. A failed or
/// negative answer falls back to `fallback` with no metadata.
pub(crate) async fn quote<Sh>(api: &Sh, address: &ShippingAddress, fallback: Money) -> ShippingState
where
    Sh: ShippingApi + ?Sized,
{
    let target = destination(address);
    if target.city.is_empty() {
        return ShippingState {
            quoted_for: Some(target),
            ..ShippingState::default()
        };
    }

    let request = ShippingQuoteRequest {
        address: target.clone(),
    };
    match api.quote(&request).await {
        Ok(quote) if quote.ok => {
            tracing::debug!(city = %target.city, cost = %quote.shipping, "shipping quoted");
            ShippingState {
                cost: quote.shipping.non_negative(),
                details: Some(QuoteDetails::from(quote)),
                fallback: false,
                quoted_for: Some(target),
            }
        }
        Ok(_) => {
            tracing::info!(city = %target.city, "no shipping quote, using fallback");
            fallback_state(target, fallback)
        }
        Err(e) => {
            tracing::warn!(city = %target.city, error = %e, "shipping quote failed, using fallback");
            fallback_state(target, fallback)
        }
    }
}

fn fallback_state(target: QuoteAddress, fallback: Money) -> ShippingState {
    ShippingState {
        cost: fallback,
        details: None,
        fallback: true,
        quoted_for: Some(target),
    }
}

#[cfg(test)]
mod tests {
    use backend::DistanceShippingQuoter;

    use super::*;

    fn address(city: &str) -> ShippingAddress {
        ShippingAddress {
            city: city.to_string(),
            ..ShippingAddress::default()
        }
    }

    #[tokio::test]
    async fn empty_city_is_free_and_unquoted() {
        let api = DistanceShippingQuoter::new();
        let state = quote(&api, &address("  "), Money::from_major(25)).await;
        assert_eq!(state.cost, Money::zero());
        assert!(!state.is_quoted());
        assert!(!state.fallback);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn known_city_carries_metadata() {
        let api = DistanceShippingQuoter::new();
        let state = quote(&api, &address("Jeddah"), Money::from_major(25)).await;
        let details = state.details.clone().unwrap();
        assert_eq!(details.method.as_deref(), Some("distance"));
        assert!(details.distance_km.unwrap() > 800.0);
        assert!(details.eta_days.is_some());
        assert!(state.cost.is_positive());
        assert!(!state.needs_quote(&address("Jeddah")));
        assert!(state.needs_quote(&address("Dammam")));
    }

    #[tokio::test]
    async fn failure_uses_fallback() {
        let api = DistanceShippingQuoter::new();
        api.set_fail(true);
        let state = quote(&api, &address("Riyadh"), Money::from_major(25)).await;
        assert_eq!(state.cost, Money::from_major(25));
        assert!(state.fallback);
        assert!(state.details.is_none());
    }
}
