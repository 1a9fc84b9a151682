//! Buyer profile.

use dinero_store_core::ShippingAddress;
use serde::{Deserialize, Serialize};

/// The buyer's local profile.
///
/// Holds at most one shipping address, overwritten on edit (not
/// versioned). Lives inside the persisted local store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}
