//! Cart line items.

use dinero_store_core::{ProductId, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors from cart item construction and mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartItemError {
    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// Unit price cannot be negative.
    #[error("unit price cannot be negative")]
    NegativePrice,
}

/// One line in the buyer's cart.
///
/// Invariants (`quantity >= 1`, `unit_price_fiat >= 0`) are enforced at
/// construction; mutation goes through [`crate::store::LocalStore`], which
/// re-checks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Print-provider product id.
    pub id: ProductId,
    pub name: String,
    /// Unit price in the reference currency (USD).
    pub unit_price_fiat: Decimal,
    pub quantity: u32,
    /// Product image URL for display and receipts.
    pub image: String,
    /// Selected provider variant, when the product has more than one.
    #[serde(default)]
    pub variant_id: Option<VariantId>,
}

impl CartItem {
    /// Create a cart item, enforcing the quantity and price invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CartItemError::ZeroQuantity`] or
    /// [`CartItemError::NegativePrice`].
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        unit_price_fiat: Decimal,
        quantity: u32,
        image: impl Into<String>,
        variant_id: Option<VariantId>,
    ) -> Result<Self, CartItemError> {
        if quantity == 0 {
            return Err(CartItemError::ZeroQuantity);
        }
        if unit_price_fiat < Decimal::ZERO {
            return Err(CartItemError::NegativePrice);
        }

        Ok(Self {
            id,
            name: name.into(),
            unit_price_fiat,
            quantity,
            image: image.into(),
            variant_id,
        })
    }

    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price_fiat * Decimal::from(self.quantity)
    }
}

/// Sum of line totals for a cart snapshot.
#[must_use]
pub fn fiat_total(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(price_cents: i64, quantity: u32) -> CartItem {
        CartItem::new(
            ProductId::new("prod-1"),
            "Dinero Tee",
            Decimal::new(price_cents, 2),
            quantity,
            "https://img.example/tee.png",
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = CartItem::new(
            ProductId::new("p"),
            "x",
            Decimal::ONE,
            0,
            "",
            None,
        );
        assert_eq!(result.unwrap_err(), CartItemError::ZeroQuantity);
    }

    #[test]
    fn test_negative_price_rejected() {
        let result = CartItem::new(
            ProductId::new("p"),
            "x",
            Decimal::new(-1, 2),
            1,
            "",
            None,
        );
        assert_eq!(result.unwrap_err(), CartItemError::NegativePrice);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item(19_99, 3).line_total(), Decimal::new(59_97, 2));
    }

    #[test]
    fn test_fiat_total_sums_lines() {
        let items = vec![item(25_00, 1), item(12_50, 2)];
        assert_eq!(fiat_total(&items), Decimal::new(50_00, 2));
    }

    #[test]
    fn test_free_item_allowed() {
        assert!(CartItem::new(ProductId::new("p"), "sticker", Decimal::ZERO, 1, "", None).is_ok());
    }
}
