//! Shipping address type shared by the storefront engine and the gateway.

use serde::{Deserialize, Serialize};

use super::email::Email;

/// Errors from structural address validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AddressError {
    /// A required field is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// A buyer's shipping address.
///
/// One per profile, overwritten on edit. Field names mirror the print
/// provider's wire format (`first_name`, `address1`, `zip`) so the address
/// serializes straight into provider requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    /// State/province display name or two-letter code.
    pub state: String,
    /// Country display name or two-letter code. Checkout only ships to the
    /// US; the field exists so the profile form round-trips what the buyer
    /// typed.
    pub country: String,
    pub zip: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Structurally validate the address: every required field non-empty.
    ///
    /// Region resolvability is checked later, at fulfillment time, because
    /// an unknown region is a warning there rather than a checkout blocker.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingField`] naming the first empty
    /// required field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required: [(&'static str, &str); 7] = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("zip", &self.zip),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }

        Ok(())
    }

    /// The buyer's full display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
