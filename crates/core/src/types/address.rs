//! Structured shipping address.

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank.
    #[error("address {0} is required")]
    MissingField(&'static str),
    /// A field exceeds the storage limit.
    #[error("address {field} must be at most {max} characters")]
    TooLong {
        /// Offending field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// Where an order ships to. Every field is required.
///
/// Deserialization is lenient (missing fields become empty strings) so that
/// [`ShippingAddress::validate`] can name the first blank field in its error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Maximum length of any single field.
    pub const MAX_FIELD_LENGTH: usize = 200;

    fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
    }

    /// Check every field is present and within bounds.
    ///
    /// # Errors
    ///
    /// Returns the first blank or oversized field.
    pub fn validate(&self) -> Result<(), AddressError> {
        for (field, value) in self.fields() {
            let value = value.trim();
            if value.is_empty() {
                return Err(AddressError::MissingField(field));
            }
            if value.chars().count() > Self::MAX_FIELD_LENGTH {
                return Err(AddressError::TooLong {
                    field,
                    max: Self::MAX_FIELD_LENGTH,
                });
            }
        }
        Ok(())
    }

    /// Copy with surrounding whitespace removed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            street: self.street.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> ShippingAddress {
        ShippingAddress {
            street: "12 MG Road".to_owned(),
            city: "Pune".to_owned(),
            state: "MH".to_owned(),
            postal_code: "411001".to_owned(),
            country: "India".to_owned(),
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_blank_field_is_named() {
        let address = ShippingAddress {
            postal_code: "   ".to_owned(),
            ..sample()
        };
        assert_eq!(
            address.validate(),
            Err(AddressError::MissingField("postalCode"))
        );
    }

    #[test]
    fn test_missing_json_field_fails_validation() {
        let address: ShippingAddress =
            serde_json::from_str(r#"{"street":"1 Main","city":"X","state":"Y","country":"Z"}"#)
                .unwrap();
        assert_eq!(
            address.validate(),
            Err(AddressError::MissingField("postalCode"))
        );
    }

    #[test]
    fn test_oversized_field() {
        let address = ShippingAddress {
            city: "x".repeat(ShippingAddress::MAX_FIELD_LENGTH + 1),
            ..sample()
        };
        assert!(matches!(
            address.validate(),
            Err(AddressError::TooLong { field: "city", .. })
        ));
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["postalCode"], "411001");
    }

    #[test]
    fn test_trimmed() {
        let address = ShippingAddress {
            street: "  12 MG Road ".to_owned(),
            ..sample()
        };
        assert_eq!(address.trimmed().street, "12 MG Road");
    }
}
