use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A persisted blob of client state under a single key.
///
/// The state is stored wholesale on every change; there is no incremental
/// format and no schema beyond what the owner serializes into `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Storage key this snapshot is kept under.
    pub key: String,

    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,

    /// The serialized state.
    pub state: serde_json::Value,
}

impl Snapshot {
    /// Creates a new snapshot of raw JSON state.
    pub fn new(key: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            saved_at: Utc::now(),
            state,
        }
    }

    /// Creates a snapshot from a serializable state.
    pub fn from_state<T: Serialize>(
        key: impl Into<String>,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key: key.into(),
            saved_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the state into a concrete type.
    pub fn into_state<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Address {
        city: String,
    }

    #[test]
    fn from_state_and_back() {
        let addr = Address {
            city: "Riyadh".to_string(),
        };
        let snapshot = Snapshot::from_state("addr", &addr).unwrap();
        assert_eq!(snapshot.key, "addr");
        assert_eq!(snapshot.state["city"], "Riyadh");

        let back: Address = snapshot.into_state().unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn into_state_reports_shape_mismatch() {
        let snapshot = Snapshot::new("addr", serde_json::json!([1, 2, 3]));
        assert!(snapshot.into_state::<Address>().is_err());
    }
}
