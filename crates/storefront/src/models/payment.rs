//! Payment quote and result types.

use chrono::{DateTime, Utc};
use dinero_store_core::{Lamports, PriceError, TxSignature, lamports_for_fiat};
use rust_decimal::Decimal;

/// A point-in-time conversion of the cart total into lamports.
///
/// Derived, never persisted. The quote is a value snapshot: a background
/// rate refresh after it is computed does not change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentQuote {
    /// Cart total in the reference currency (USD).
    pub fiat_total: Decimal,
    /// Fiat per whole SOL at quote time.
    pub exchange_rate: Decimal,
    /// Transfer amount, rounded up at lamport granularity.
    pub native_amount: Lamports,
    pub computed_at: DateTime<Utc>,
}

impl PaymentQuote {
    /// Compute a quote from a fiat total and an exchange rate.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] for a non-positive rate, negative total,
    /// or lamport overflow.
    pub fn compute(
        fiat_total: Decimal,
        exchange_rate: Decimal,
        computed_at: DateTime<Utc>,
    ) -> Result<Self, PriceError> {
        let native_amount = lamports_for_fiat(fiat_total, exchange_rate)?;
        Ok(Self {
            fiat_total,
            exchange_rate,
            native_amount,
            computed_at,
        })
    }
}

/// Outcome of a payment attempt that produced a transaction.
///
/// Created pending inside the submitter and only surfaced once terminal:
/// either `confirmed` or carrying the failure detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    /// Opaque transaction identifier assigned at submission.
    pub signature: TxSignature,
    pub confirmed: bool,
    /// Failure detail for unconfirmed terminal results.
    pub error: Option<String>,
}

impl PaymentResult {
    /// A confirmed payment.
    #[must_use]
    pub const fn confirmed(signature: TxSignature) -> Self {
        Self {
            signature,
            confirmed: true,
            error: None,
        }
    }
}
