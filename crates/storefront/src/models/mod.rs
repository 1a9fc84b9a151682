//! Domain models for the storefront engine.

pub mod cart;
pub mod order;
pub mod payment;
pub mod profile;

pub use cart::{CartItem, CartItemError};
pub use order::{CustomerProfile, FulfillmentLineItem, FulfillmentOrder, OrderRecord};
pub use payment::{PaymentQuote, PaymentResult};
pub use profile::UserProfile;
