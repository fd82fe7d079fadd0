//! Cart line arithmetic.
//!
//! A cart is a list of (sticker, quantity) lines with at most one line per
//! sticker. The storefront loads the list, applies one of the operations here
//! and writes the whole list back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, StickerId};

/// Upper bound on the quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Convert a client-supplied quantity into a line quantity.
///
/// Returns `None` for anything below 1 or above [`MAX_LINE_QUANTITY`].
#[must_use]
pub fn checked_quantity(raw: i64) -> Option<u32> {
    u32::try_from(raw)
        .ok()
        .filter(|quantity| (1..=MAX_LINE_QUANTITY).contains(quantity))
}

/// Errors from editing a cart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Quantity cannot exceed {max}")]
    QuantityTooLarge { max: u32 },

    #[error("Item not found in cart")]
    LineNotFound(StickerId),
}

/// One cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub sticker_id: StickerId,
    pub quantity: u32,
}

/// The lines of a single cart, in insertion order.
///
/// Serialized as a plain array of lines. Deserializing folds duplicate
/// stickers together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct CartLines(Vec<CartLine>);

impl From<Vec<CartLine>> for CartLines {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<CartLines> for Vec<CartLine> {
    fn from(cart: CartLines) -> Self {
        cart.0
    }
}

impl CartLines {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from stored lines, folding duplicates and dropping empty lines.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines.into_iter().filter(|line| line.quantity > 0) {
            match cart.line_mut(line.sticker_id) {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .saturating_add(line.quantity)
                        .min(MAX_LINE_QUANTITY);
                }
                None => cart.0.push(line),
            }
        }
        cart
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Quantity held for `sticker_id`, if there is a line for it.
    #[must_use]
    pub fn quantity_of(&self, sticker_id: StickerId) -> Option<u32> {
        self.0
            .iter()
            .find(|line| line.sticker_id == sticker_id)
            .map(|line| line.quantity)
    }

    /// Distinct sticker ids, in line order.
    #[must_use]
    pub fn sticker_ids(&self) -> Vec<StickerId> {
        self.0.iter().map(|line| line.sticker_id).collect()
    }

    fn line_mut(&mut self, sticker_id: StickerId) -> Option<&mut CartLine> {
        self.0.iter_mut().find(|line| line.sticker_id == sticker_id)
    }

    /// Add `quantity` units of a sticker, merging into an existing line.
    ///
    /// Returns the line's quantity after the add.
    ///
    /// # Errors
    ///
    /// Returns an error if `quantity` is zero or the merged line would exceed
    /// [`MAX_LINE_QUANTITY`]. The cart is unchanged on error.
    pub fn add(&mut self, sticker_id: StickerId, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let current = self.quantity_of(sticker_id).unwrap_or(0);
        let merged = current
            .checked_add(quantity)
            .filter(|merged| *merged <= MAX_LINE_QUANTITY)
            .ok_or(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            })?;

        match self.line_mut(sticker_id) {
            Some(line) => line.quantity = merged,
            None => self.0.push(CartLine {
                sticker_id,
                quantity: merged,
            }),
        }
        Ok(merged)
    }

    /// Drop the line for `sticker_id`. Returns whether a line was removed.
    pub fn remove(&mut self, sticker_id: StickerId) -> bool {
        let before = self.0.len();
        self.0.retain(|line| line.sticker_id != sticker_id);
        self.0.len() != before
    }

    /// Drop every line whose sticker is in `sticker_ids`.
    pub fn remove_all(&mut self, sticker_ids: &[StickerId]) {
        self.0.retain(|line| !sticker_ids.contains(&line.sticker_id));
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns an error if `quantity` is out of range or there is no line for
    /// `sticker_id`.
    pub fn set_quantity(&mut self, sticker_id: StickerId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            });
        }
        let line = self
            .line_mut(sticker_id)
            .ok_or(CartError::LineNotFound(sticker_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Sum of current price times quantity.
    ///
    /// Lines whose sticker `price_of` cannot resolve contribute nothing.
    pub fn total(&self, price_of: impl Fn(StickerId) -> Option<Price>) -> Decimal {
        self.0
            .iter()
            .filter_map(|line| price_of(line.sticker_id).map(|price| price.times(line.quantity)))
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const A: StickerId = StickerId::new(1);
    const B: StickerId = StickerId::new(2);

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_checked_quantity() {
        assert_eq!(checked_quantity(1), Some(1));
        assert_eq!(checked_quantity(0), None);
        assert_eq!(checked_quantity(-4), None);
        assert_eq!(checked_quantity(i64::from(MAX_LINE_QUANTITY) + 1), None);
    }

    #[test]
    fn test_repeated_add_merges_into_one_line() {
        let mut cart = CartLines::new();
        cart.add(A, 1).unwrap();
        assert_eq!(cart.add(A, 2).unwrap(), 3);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(A), Some(3));
    }

    #[test]
    fn test_repeated_add_quantity_is_sum() {
        let mut cart = CartLines::new();
        let adds = [4, 1, 7, 2, 2];
        for quantity in adds {
            cart.add(A, quantity).unwrap();
        }
        cart.add(B, 5).unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity_of(A), Some(adds.iter().sum()));
        assert_eq!(cart.sticker_ids(), vec![A, B]);
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let mut cart = CartLines::new();
        assert_eq!(cart.add(A, 0), Err(CartError::InvalidQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_overflow_leaves_cart_unchanged() {
        let mut cart = CartLines::new();
        cart.add(A, MAX_LINE_QUANTITY).unwrap();
        assert!(matches!(
            cart.add(A, 1),
            Err(CartError::QuantityTooLarge { .. })
        ));
        assert_eq!(cart.quantity_of(A), Some(MAX_LINE_QUANTITY));
    }

    #[test]
    fn test_remove_absent_line_is_noop() {
        let mut cart = CartLines::new();
        cart.add(A, 1).unwrap();
        let before = cart.clone();

        assert!(!cart.remove(B));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_present_line() {
        let mut cart = CartLines::new();
        cart.add(A, 1).unwrap();
        cart.add(B, 1).unwrap();

        assert!(cart.remove(A));
        assert_eq!(cart.sticker_ids(), vec![B]);
    }

    #[test]
    fn test_remove_all() {
        let mut cart = CartLines::new();
        cart.add(A, 1).unwrap();
        cart.add(B, 1).unwrap();
        cart.add(StickerId::new(3), 1).unwrap();

        cart.remove_all(&[A, StickerId::new(3)]);
        assert_eq!(cart.sticker_ids(), vec![B]);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = CartLines::new();
        cart.add(A, 5).unwrap();

        cart.set_quantity(A, 2).unwrap();
        assert_eq!(cart.quantity_of(A), Some(2));
    }

    #[test]
    fn test_set_quantity_errors() {
        let mut cart = CartLines::new();
        cart.add(A, 5).unwrap();

        assert_eq!(cart.set_quantity(A, 0), Err(CartError::InvalidQuantity));
        assert_eq!(cart.set_quantity(B, 1), Err(CartError::LineNotFound(B)));
        assert_eq!(cart.quantity_of(A), Some(5));
    }

    #[test]
    fn test_total_skips_unresolvable_lines() {
        let mut cart = CartLines::new();
        cart.add(A, 2).unwrap();
        cart.add(B, 3).unwrap();

        let total = cart.total(|id| (id == A).then(|| price("100")));
        assert_eq!(total, Decimal::from(200));
    }

    #[test]
    fn test_total_of_empty_cart_is_zero() {
        assert_eq!(CartLines::new().total(|_| None), Decimal::ZERO);
    }

    #[test]
    fn test_from_lines_folds_duplicates() {
        let cart = CartLines::from_lines([
            CartLine {
                sticker_id: A,
                quantity: 1,
            },
            CartLine {
                sticker_id: B,
                quantity: 0,
            },
            CartLine {
                sticker_id: A,
                quantity: 2,
            },
        ]);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(A), Some(3));
    }

    #[test]
    fn test_deserialize_folds_duplicates() {
        let cart: CartLines = serde_json::from_str(
            r#"[{"stickerId":1,"quantity":1},{"stickerId":1,"quantity":4}]"#,
        )
        .unwrap();
        assert_eq!(cart.quantity_of(A), Some(5));
    }

    #[test]
    fn test_stored_json_shape() {
        let mut cart = CartLines::new();
        cart.add(A, 2).unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        assert_eq!(json, r#"[{"stickerId":1,"quantity":2}]"#);
    }
}
