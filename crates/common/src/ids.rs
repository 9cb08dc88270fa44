use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Product identifier, unique within a cart (the line-item key).
    ProductId
);

string_id!(
    /// Identifier of an order resource assigned by the backend.
    OrderId
);

string_id!(
    /// Identifier of an authenticated storefront user.
    UserId
);

/// Storefront display locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
    Fr,
}

impl Locale {
    /// Returns the locale tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ar => "ar",
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn product_id_string_conversion() {
        let id = ProductId::new("ckx9abc123def");
        assert_eq!(id.as_str(), "ckx9abc123def");

        let id2: ProductId = "p_1".into();
        assert_eq!(id2.to_string(), "p_1");
    }

    #[test]
    fn blank_ids_are_detected() {
        assert!(ProductId::new("").is_blank());
        assert!(ProductId::new("   ").is_blank());
        assert!(!ProductId::new("p_1").is_blank());
    }

    #[test]
    fn ids_can_be_looked_up_by_str() {
        let mut map = HashMap::new();
        map.insert(ProductId::new("sku-1"), 3);
        assert_eq!(map.get("sku-1"), Some(&3));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = OrderId::new("ord_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ord_1\"");
    }

    #[test]
    fn locale_defaults_to_arabic() {
        assert_eq!(Locale::default(), Locale::Ar);
        assert_eq!(serde_json::to_string(&Locale::Fr).unwrap(), "\"fr\"");
    }
}
