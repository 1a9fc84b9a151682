//! Fiat and native-token amount types.
//!
//! Product prices are quoted in USD (`rust_decimal::Decimal`); payments
//! settle in SOL, counted in lamports. [`lamports_for_fiat`] is the single
//! conversion point between the two worlds, so the ceiling semantics live
//! in exactly one place.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Errors from fiat-to-lamport conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The exchange rate is zero or negative.
    #[error("exchange rate must be positive")]
    NonPositiveRate,
    /// The fiat total is negative.
    #[error("fiat total cannot be negative")]
    NegativeTotal,
    /// The computed amount does not fit in a `u64` lamport count.
    #[error("amount overflows lamport range")]
    Overflow,
}

/// An amount of the native token in its smallest unit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Lamports(u64);

impl Lamports {
    /// Zero lamports.
    pub const ZERO: Self = Self(0);

    /// Create from a raw lamport count.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw lamport count.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Saturating addition, used for fee-buffer arithmetic.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// The amount expressed in whole SOL.
    #[must_use]
    pub fn as_sol(self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(LAMPORTS_PER_SOL)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SOL", self.as_sol().normalize())
    }
}

impl From<u64> for Lamports {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Convert a fiat total into lamports at the given fiat-per-SOL rate.
///
/// The division is rounded up at lamport granularity, so the store never
/// undercharges by a fraction of the smallest unit. The result is strictly
/// monotonic in `fiat_total` for a fixed rate.
///
/// # Errors
///
/// Returns [`PriceError::NonPositiveRate`] for a zero or negative rate,
/// [`PriceError::NegativeTotal`] for a negative total, and
/// [`PriceError::Overflow`] when the result exceeds the lamport range.
pub fn lamports_for_fiat(fiat_total: Decimal, fiat_per_sol: Decimal) -> Result<Lamports, PriceError> {
    if fiat_per_sol <= Decimal::ZERO {
        return Err(PriceError::NonPositiveRate);
    }
    if fiat_total < Decimal::ZERO {
        return Err(PriceError::NegativeTotal);
    }

    let sol = fiat_total
        .checked_div(fiat_per_sol)
        .ok_or(PriceError::Overflow)?;
    let lamports = sol
        .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
        .ok_or(PriceError::Overflow)?
        .ceil();

    lamports.to_u64().map(Lamports::new).ok_or(PriceError::Overflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_exact_division() {
        // $50.00 at $100/SOL is exactly half a SOL.
        let amount = lamports_for_fiat(usd(50_00), Decimal::from(100)).unwrap();
        assert_eq!(amount, Lamports::new(500_000_000));
        assert_eq!(amount.as_sol(), Decimal::new(5, 1));
    }

    #[test]
    fn test_ceiling_applied_at_lamport_granularity() {
        // $1 at $3/SOL is 333_333_333.33... lamports; we round up.
        let amount = lamports_for_fiat(Decimal::ONE, Decimal::from(3)).unwrap();
        assert_eq!(amount, Lamports::new(333_333_334));
    }

    #[test]
    fn test_zero_total_is_zero_lamports() {
        assert_eq!(
            lamports_for_fiat(Decimal::ZERO, Decimal::from(100)).unwrap(),
            Lamports::ZERO
        );
    }

    #[test]
    fn test_strictly_monotonic_in_fiat_total() {
        let rate = usd(142_37);
        let mut prev = Lamports::ZERO;
        for cents in 1i64..=500 {
            let fiat = usd(cents);
            let amount = lamports_for_fiat(fiat, rate).unwrap();
            assert!(amount > prev, "not monotonic at {fiat}");
            prev = amount;
        }
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        assert_eq!(
            lamports_for_fiat(Decimal::TEN, Decimal::ZERO),
            Err(PriceError::NonPositiveRate)
        );
        assert_eq!(
            lamports_for_fiat(Decimal::TEN, Decimal::from(-1)),
            Err(PriceError::NonPositiveRate)
        );
    }

    #[test]
    fn test_negative_total_rejected() {
        assert_eq!(
            lamports_for_fiat(usd(-1), Decimal::from(100)),
            Err(PriceError::NegativeTotal)
        );
    }

    #[test]
    fn test_saturating_add() {
        let max = Lamports::new(u64::MAX);
        assert_eq!(max.saturating_add(Lamports::new(1)), max);
    }

    #[test]
    fn test_display_in_sol() {
        assert_eq!(Lamports::new(500_000_000).to_string(), "0.5 SOL");
        assert_eq!(Lamports::new(5_000).to_string(), "0.000005 SOL");
    }
}
