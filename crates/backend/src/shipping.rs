//! Shipping quote trait and a distance-based in-memory quoter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::Money;
use domain::GeoPoint;

use crate::error::{BackendError, Result};
use crate::lock;
use crate::types::{ShippingQuote, ShippingQuoteRequest};

/// Quotes the shipping cost to a destination.
#[async_trait]
pub trait ShippingApi: Send + Sync {
    async fn quote(&self, request: &ShippingQuoteRequest) -> Result<ShippingQuote>;
}

struct City {
    key: &'static str,
    names: &'static [&'static str],
    lat: f64,
    lng: f64,
}

const CITIES: &[City] = &[
    City { key: "riyadh", names: &["riyadh", "riy", "رياض"], lat: 24.7136, lng: 46.6753 },
    City { key: "jeddah", names: &["jeddah", "jed", "جدة"], lat: 21.4858, lng: 39.1925 },
    City { key: "dammam", names: &["dammam", "الدمام", "دمام"], lat: 26.4207, lng: 50.0888 },
    City { key: "khobar", names: &["khobar", "الخبر", "خبر"], lat: 26.2794, lng: 50.2083 },
    City { key: "makkah", names: &["makkah", "mecca", "مكة"], lat: 21.3891, lng: 39.8579 },
    City { key: "madinah", names: &["madinah", "medina", "المدينة"], lat: 24.5247, lng: 39.5692 },
    City { key: "abha", names: &["abha", "ابها", "أبها"], lat: 18.2465, lng: 42.5117 },
    City { key: "jizan", names: &["jizan", "gizan", "جازان", "جيزان"], lat: 16.8892, lng: 42.5700 },
    City { key: "hail", names: &["hail", "حائل", "حايل"], lat: 27.5114, lng: 41.7208 },
    City { key: "qassim", names: &["qassim", "buraydah", "القصيم", "بريدة"], lat: 26.3594, lng: 43.9790 },
    City { key: "tabuk", names: &["tabuk", "تبوك"], lat: 28.3833, lng: 36.5667 },
    City { key: "taif", names: &["taif", "الطائف"], lat: 21.4373, lng: 40.5127 },
    City { key: "ahsa", names: &["ahsa", "al-hasa", "الأحساء", "الاحساء"], lat: 25.3833, lng: 49.6000 },
];

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

fn normalize_city(raw: &str) -> String {
    let stripped: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !('\u{064B}'..='\u{0652}').contains(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_city(raw: &str) -> Option<&'static City> {
    let normalized = normalize_city(raw);
    if normalized.is_empty() {
        return None;
    }
    CITIES
        .iter()
        .find(|city| city.names.iter().any(|name| normalized.contains(name)))
}

#[derive(Debug, Default)]
struct QuoterState {
    calls: usize,
    last_request: Option<ShippingQuoteRequest>,
    fail: bool,
}

/// Quotes by distance from the store origin to a known city:
/// `base + per_km * distance`, clamped to `[min, max]`. Unknown cities get
/// the flat `fallback` rate, unless the request carries a geo point.
#[derive(Debug, Clone)]
pub struct DistanceShippingQuoter {
    pub origin: GeoPoint,
    pub base: Money,
    /// Cost per kilometre in minor units.
    pub per_km_cents: f64,
    pub min: Money,
    pub max: Money,
    pub fallback: Money,
    state: Arc<Mutex<QuoterState>>,
}

impl Default for DistanceShippingQuoter {
    fn default() -> Self {
        Self {
            origin: GeoPoint {
                lat: 24.7136,
                lng: 46.6753,
            },
            base: Money::from_major(10),
            per_km_cents: 70.0,
            min: Money::from_major(15),
            max: Money::from_major(60),
            fallback: Money::from_major(25),
            state: Arc::default(),
        }
    }
}

impl DistanceShippingQuoter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every quote to fail.
    pub fn set_fail(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    /// Returns how many quotes were requested.
    pub fn calls(&self) -> usize {
        lock(&self.state).calls
    }

    pub fn last_request(&self) -> Option<ShippingQuoteRequest> {
        lock(&self.state).last_request.clone()
    }

    /// Fee for a distance, clamped into `[min, max]`.
    pub fn fee_for(&self, distance_km: f64) -> Money {
        let raw = self.base.cents() as f64 + distance_km * self.per_km_cents;
        Money::from_cents(raw.round() as i64).clamp(self.min, self.max)
    }

    fn distance_quote(&self, distance_km: f64, method: &str, city: Option<&str>) -> ShippingQuote {
        let (hours, days) = eta_for(distance_km);
        ShippingQuote {
            ok: true,
            shipping: self.fee_for(distance_km),
            method: Some(method.to_string()),
            distance_km: Some((distance_km * 10.0).round() / 10.0),
            city_matched: city.map(str::to_string),
            eta_hours_min: hours.map(|h| h.0),
            eta_hours_max: hours.map(|h| h.1),
            eta_days_min: days.map(|d| d.0),
            eta_days_max: days.map(|d| d.1),
        }
    }
}

/// Same-city deliveries are quoted in hours, everything else in days.
fn eta_for(distance_km: f64) -> (Option<(u32, u32)>, Option<(u32, u32)>) {
    if distance_km < 50.0 {
        (Some((4, 24)), None)
    } else {
        let extra = (distance_km / 500.0).floor() as u32;
        (None, Some((1 + extra, 3 + extra)))
    }
}

#[async_trait]
impl ShippingApi for DistanceShippingQuoter {
    async fn quote(&self, request: &ShippingQuoteRequest) -> Result<ShippingQuote> {
        {
            let mut state = lock(&self.state);
            state.calls += 1;
            state.last_request = Some(request.clone());
            if state.fail {
                return Err(BackendError::Unavailable("shipping quotes down".to_string()));
            }
        }

        if let Some(city) = find_city(&request.address.city) {
            let distance = haversine_km(
                self.origin,
                GeoPoint {
                    lat: city.lat,
                    lng: city.lng,
                },
            );
            return Ok(self.distance_quote(distance, "distance", Some(city.key)));
        }

        if let Some(geo) = request.address.geo {
            let distance = haversine_km(self.origin, geo);
            return Ok(self.distance_quote(distance, "geo", None));
        }

        Ok(ShippingQuote {
            ok: true,
            shipping: self.fallback,
            method: Some("fallback".to_string()),
            distance_km: None,
            city_matched: None,
            eta_hours_min: None,
            eta_hours_max: None,
            eta_days_min: None,
            eta_days_max: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuoteAddress;

    fn request(city: &str) -> ShippingQuoteRequest {
        ShippingQuoteRequest {
            address: QuoteAddress {
                city: city.to_string(),
                country: "SA".to_string(),
                geo: None,
            },
        }
    }

    #[tokio::test]
    async fn same_city_hits_minimum_fee() {
        let quoter = DistanceShippingQuoter::new();
        let quote = quoter.quote(&request("Riyadh")).await.unwrap();
        assert_eq!(quote.shipping, Money::from_major(15));
        assert_eq!(quote.city_matched.as_deref(), Some("riyadh"));
        assert_eq!(quote.distance_km, Some(0.0));
        assert_eq!(quote.eta_hours_min, Some(4));
    }

    #[tokio::test]
    async fn far_city_is_capped() {
        let quoter = DistanceShippingQuoter::new();
        let quote = quoter.quote(&request("  JEDDAH ")).await.unwrap();
        assert_eq!(quote.shipping, Money::from_major(60));
        let km = quote.distance_km.unwrap();
        assert!((800.0..900.0).contains(&km), "{km}");
        assert_eq!(quote.eta_days_min, Some(2));
    }

    #[tokio::test]
    async fn arabic_city_names_match() {
        let quoter = DistanceShippingQuoter::new();
        let quote = quoter.quote(&request("الدمام")).await.unwrap();
        assert_eq!(quote.city_matched.as_deref(), Some("dammam"));
    }

    #[tokio::test]
    async fn unknown_city_falls_back() {
        let quoter = DistanceShippingQuoter::new();
        let quote = quoter.quote(&request("Atlantis")).await.unwrap();
        assert_eq!(quote.shipping, Money::from_major(25));
        assert_eq!(quote.method.as_deref(), Some("fallback"));
        assert!(quote.distance_km.is_none());
    }

    #[tokio::test]
    async fn geo_point_is_used_for_unknown_city() {
        let quoter = DistanceShippingQuoter::new();
        let mut req = request("Unlisted village");
        req.address.geo = Some(GeoPoint {
            lat: 24.72,
            lng: 46.68,
        });
        let quote = quoter.quote(&req).await.unwrap();
        assert_eq!(quote.method.as_deref(), Some("geo"));
        assert_eq!(quote.shipping, Money::from_major(15));
    }

    #[test]
    fn fee_formula() {
        let quoter = DistanceShippingQuoter::new();
        assert_eq!(quoter.fee_for(20.0), Money::from_major(24));
        assert_eq!(quoter.fee_for(0.0), Money::from_major(15));
        assert_eq!(quoter.fee_for(1000.0), Money::from_major(60));
    }

    #[test]
    fn haversine_riyadh_dammam() {
        let km = haversine_km(
            GeoPoint {
                lat: 24.7136,
                lng: 46.6753,
            },
            GeoPoint {
                lat: 26.4207,
                lng: 50.0888,
            },
        );
        assert!((380.0..400.0).contains(&km), "{km}");
    }
}
