//! Cart domain events, published to UI subscribers.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::cart::AddKind;

/// Trait for domain events.
///
/// Events describe something that already happened and are named in the
/// past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;
}

/// Events raised by the cart store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// A product was added; raised before the backend confirms anything.
    ItemAdded(ItemAddedData),

    /// A cart mutation was refused because nobody is signed in.
    AuthRequired(AuthRequiredData),

    /// The backend had less stock than requested and the line was rolled back.
    StockConflict(StockConflictData),

    /// The login merge could not carry every local line over.
    MergeSkipped(MergeSkippedData),

    /// A backend call failed for a reason other than stock.
    SyncFailed(SyncFailedData),

    /// The cart persisted by an earlier visit was loaded.
    OldCartRestored(OldCartData),

    /// The cart persisted by an earlier visit was thrown away.
    OldCartDiscarded(OldCartData),

    /// The cart was emptied.
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAddedData {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    /// Units added by this call.
    pub quantity: u32,
    pub kind: AddKind,
    /// Line quantity after the add.
    pub line_quantity: u32,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequiredData {
    pub code: String,
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockConflictData {
    pub product_id: ProductId,
    pub requested: u32,
    pub available: u32,
    /// Quantity after rollback; zero means the line was removed.
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSkippedData {
    pub count: usize,
    pub product_ids: Vec<ProductId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailedData {
    pub product_id: Option<ProductId>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OldCartData {
    pub line_count: usize,
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => "ItemAdded",
            CartEvent::AuthRequired(_) => "AuthRequired",
            CartEvent::StockConflict(_) => "StockConflict",
            CartEvent::MergeSkipped(_) => "MergeSkipped",
            CartEvent::SyncFailed(_) => "SyncFailed",
            CartEvent::OldCartRestored(_) => "OldCartRestored",
            CartEvent::OldCartDiscarded(_) => "OldCartDiscarded",
            CartEvent::Cleared => "Cleared",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_is_tagged() {
        let event = CartEvent::StockConflict(StockConflictData {
            product_id: ProductId::new("p_1"),
            requested: 5,
            available: 2,
            quantity: 2,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "StockConflict");
        assert_eq!(value["data"]["available"], 2);

        let back: CartEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back.event_type(), "StockConflict");
    }

    #[test]
    fn unit_variant_has_no_data() {
        let value = serde_json::to_value(CartEvent::Cleared).unwrap();
        assert_eq!(value, serde_json::json!({"type": "Cleared"}));
    }
}
