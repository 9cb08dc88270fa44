use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Shipping address collected in the first checkout phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
}

fn default_country() -> String {
    "SA".to_string()
}

impl Default for ShippingAddress {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            country: default_country(),
            city: String::new(),
            line1: String::new(),
            phone: String::new(),
            geo: None,
        }
    }
}

/// Editable address fields.
///
/// The declaration order of the validated fields is the order in which the
/// first invalid one is picked for focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressField {
    Name,
    Email,
    City,
    Line1,
    Phone,
    Country,
}

impl AddressField {
    /// Fields that must be filled in, in focus priority order.
    pub const REQUIRED: [AddressField; 5] = [
        AddressField::Name,
        AddressField::Email,
        AddressField::City,
        AddressField::Line1,
        AddressField::Phone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressField::Name => "name",
            AddressField::Email => "email",
            AddressField::City => "city",
            AddressField::Line1 => "line1",
            AddressField::Phone => "phone",
            AddressField::Country => "country",
        }
    }

    /// Returns true if changing this field changes what shipping costs.
    pub fn affects_shipping(&self) -> bool {
        matches!(self, AddressField::City | AddressField::Country)
    }

    /// Validates a single value for this field.
    pub fn validate(&self, value: &str) -> Option<FieldError> {
        match self {
            AddressField::Country => None,
            AddressField::Email if value.trim().is_empty() => Some(FieldError::Required),
            AddressField::Email if !is_plausible_email(value) => Some(FieldError::InvalidEmail),
            _ if value.trim().is_empty() => Some(FieldError::Required),
            _ => None,
        }
    }
}

impl std::fmt::Display for AddressField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a field is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    Required,
    InvalidEmail,
}

impl FieldError {
    pub fn message(&self) -> &'static str {
        match self {
            FieldError::Required => "This field is required",
            FieldError::InvalidEmail => "Enter a valid email address",
        }
    }
}

/// Per-field validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressErrors {
    errors: BTreeMap<AddressField, FieldError>,
}

impl AddressErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: AddressField) -> Option<FieldError> {
        self.errors.get(&field).copied()
    }

    /// The invalid field to focus: the first one in priority order.
    pub fn first_invalid(&self) -> Option<AddressField> {
        self.errors.keys().next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AddressField, FieldError)> + '_ {
        self.errors.iter().map(|(field, error)| (*field, *error))
    }
}

impl std::fmt::Display for AddressErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.errors.keys().map(AddressField::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl ShippingAddress {
    pub fn field(&self, field: AddressField) -> &str {
        match field {
            AddressField::Name => &self.name,
            AddressField::Email => &self.email,
            AddressField::City => &self.city,
            AddressField::Line1 => &self.line1,
            AddressField::Phone => &self.phone,
            AddressField::Country => &self.country,
        }
    }

    pub fn set_field(&mut self, field: AddressField, value: impl Into<String>) {
        let value = value.into();
        match field {
            AddressField::Name => self.name = value,
            AddressField::Email => self.email = value,
            AddressField::City => self.city = value,
            AddressField::Line1 => self.line1 = value,
            AddressField::Phone => self.phone = value,
            AddressField::Country => self.country = value,
        }
    }

    /// Validates every required field.
    pub fn validate(&self) -> Result<(), AddressErrors> {
        let errors: BTreeMap<_, _> = AddressField::REQUIRED
            .iter()
            .filter_map(|field| field.validate(self.field(*field)).map(|e| (*field, e)))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AddressErrors { errors })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Something, an `@`, something, a dot, something.
fn is_plausible_email(value: &str) -> bool {
    value.char_indices().any(|(at, c)| {
        if c != '@' || at == 0 {
            return false;
        }
        let domain = &value[at + 1..];
        domain
            .char_indices()
            .any(|(dot, c)| c == '.' && dot > 0 && dot + 1 < domain.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ShippingAddress {
        ShippingAddress {
            name: "Sara".into(),
            email: "sara@example.com".into(),
            city: "Riyadh".into(),
            line1: "King Fahd Rd".into(),
            phone: "0500000000".into(),
            ..ShippingAddress::default()
        }
    }

    #[test]
    fn valid_address_passes() {
        assert!(valid().is_valid());
        assert_eq!(valid().country, "SA");
    }

    #[test]
    fn first_invalid_follows_priority_order() {
        let mut address = valid();
        address.phone.clear();
        address.city = "   ".into();
        address.email = "not-an-email".into();

        let errors = address.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.first_invalid(), Some(AddressField::Email));
        assert_eq!(errors.get(AddressField::Email), Some(FieldError::InvalidEmail));
        assert_eq!(errors.get(AddressField::City), Some(FieldError::Required));
    }

    #[test]
    fn email_shapes() {
        for ok in ["a@b.co", "first.last@mail.example.sa", "x@@y.z"] {
            assert!(is_plausible_email(ok), "{ok}");
        }
        for bad in ["@b.co", "a@.co", "a@b.", "a@b", "ab.co", ""] {
            assert!(!is_plausible_email(bad), "{bad}");
        }
    }

    #[test]
    fn country_is_never_required() {
        assert_eq!(AddressField::Country.validate(""), None);
        assert!(AddressField::City.affects_shipping());
        assert!(!AddressField::Phone.affects_shipping());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let address: ShippingAddress = serde_json::from_str(r#"{"city": "Jeddah"}"#).unwrap();
        assert_eq!(address.country, "SA");
        assert_eq!(address.city, "Jeddah");
        assert!(address.name.is_empty());
    }
}
