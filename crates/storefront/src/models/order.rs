//! Order records and fulfillment order types.

use chrono::{DateTime, Utc};
use dinero_store_core::{Email, Lamports, ProductId, ShippingAddress, TxSignature};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartItem;
use super::payment::PaymentQuote;

/// One line of a provider order: product, numeric variant, quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentLineItem {
    pub product_id: ProductId,
    pub variant_id: u64,
    pub quantity: u32,
}

/// Billing-equivalent customer profile sent alongside the shipping address.
///
/// Field names follow the provider's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    pub country_code: String,
    pub country_name: String,
    pub region: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub zip: String,
}

/// A fulfillment order as submitted to the print provider.
///
/// Created only after the payment is confirmed. Failure to create one does
/// not invalidate the payment; the order record is written regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentOrder {
    /// Our idempotency id for the provider request.
    pub external_id: String,
    /// The provider's own order id, when the response carried one.
    #[serde(default)]
    pub provider_id: Option<String>,
    pub line_items: Vec<FulfillmentLineItem>,
    /// Shipping address after region/country normalization.
    pub address: ShippingAddress,
    pub customer: CustomerProfile,
}

/// The buyer's authoritative receipt for one successful payment.
///
/// Append-only and immutable once created; the payment signature is both
/// the record id and the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Payment transaction signature; doubles as the record id.
    pub signature: TxSignature,
    /// Cart snapshot at payment time.
    pub items: Vec<CartItem>,
    pub fiat_total: Decimal,
    pub native_amount: Lamports,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Build the record from a confirmed payment and the quote it settled.
    #[must_use]
    pub fn from_confirmed_payment(
        signature: TxSignature,
        items: Vec<CartItem>,
        quote: &PaymentQuote,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            signature,
            items,
            fiat_total: quote.fiat_total,
            native_amount: quote.native_amount,
            created_at,
        }
    }

    /// The record id (the payment signature).
    #[must_use]
    pub const fn id(&self) -> &TxSignature {
        &self.signature
    }

    /// Human-facing short order number.
    #[must_use]
    pub fn order_number(&self) -> &str {
        self.signature.order_number()
    }
}
