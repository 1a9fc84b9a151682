//! Core types for Dinero Store.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod price;
pub mod region;

pub use address::{AddressError, ShippingAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{LAMPORTS_PER_SOL, Lamports, PriceError, lamports_for_fiat};
pub use region::{country_code, region_code};
