//! Order planning.
//!
//! [`OrderPlanner`] takes the requested lines of a new order and a snapshot of
//! the matching catalog rows (read under a row lock by the storefront) and
//! decides whether the order can be placed. On success it yields the priced
//! lines, the authoritative total and the stock to take from each sticker.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::checked_quantity;
use crate::types::{AddressError, Price, ShippingAddress, StickerId};

/// Upper bound on the number of lines in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// Largest total `NUMERIC(12,2)` stores: `9999999999.99`.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Reasons an order request is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    EmptyItems,

    #[error("Order cannot contain more than {max} items")]
    TooManyItems { max: usize },

    #[error("Invalid quantity for item {index}")]
    InvalidQuantity { index: usize },

    #[error("Invalid sticker: {0}")]
    InvalidSticker(StickerId),

    #[error("Insufficient stock for {title}: requested {requested}, available {available}")]
    InsufficientStock {
        sticker_id: StickerId,
        title: String,
        requested: u32,
        available: u32,
    },

    #[error("Order total cannot exceed {max}")]
    TotalTooLarge { max: Decimal },

    #[error("Invalid shipping address: {0}")]
    InvalidAddress(#[from] AddressError),
}

/// A requested line after quantity validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub sticker_id: StickerId,
    pub quantity: u32,
}

impl OrderLineRequest {
    /// Validate the raw quantity of the `index`-th requested line.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidQuantity`] if the quantity is not positive
    /// or exceeds the per-line limit.
    pub fn new(index: usize, sticker_id: StickerId, quantity: i64) -> Result<Self, OrderError> {
        let quantity = checked_quantity(quantity).ok_or(OrderError::InvalidQuantity { index })?;
        Ok(Self {
            sticker_id,
            quantity,
        })
    }
}

/// Validate the shape of an order before touching the catalog.
///
/// # Errors
///
/// Returns an error for an empty or oversized item list or an incomplete
/// address.
pub fn validate_request(
    lines: &[OrderLineRequest],
    address: &ShippingAddress,
) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyItems);
    }
    if lines.len() > MAX_ORDER_LINES {
        return Err(OrderError::TooManyItems {
            max: MAX_ORDER_LINES,
        });
    }
    address.validate()?;
    Ok(())
}

/// Catalog state of one sticker at order time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSnapshot {
    pub sticker_id: StickerId,
    pub title: String,
    pub price: Price,
    pub stock: u32,
}

/// A priced order line, frozen at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub sticker_id: StickerId,
    pub title: String,
    pub unit_price: Price,
    pub quantity: u32,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// Result of a successful plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    /// Lines in request order.
    pub lines: Vec<OrderLine>,
    /// Sum of every line total.
    pub total: Decimal,
    /// Units to take from each sticker, ascending by id.
    pub reservations: Vec<(StickerId, u32)>,
}

/// Checks requested lines against a catalog snapshot.
#[derive(Debug)]
pub struct OrderPlanner<'a> {
    catalog: HashMap<StickerId, &'a StockSnapshot>,
}

impl<'a> OrderPlanner<'a> {
    #[must_use]
    pub fn new(snapshots: &'a [StockSnapshot]) -> Self {
        Self {
            catalog: snapshots
                .iter()
                .map(|snapshot| (snapshot.sticker_id, snapshot))
                .collect(),
        }
    }

    /// Walk the requested lines in order, pricing each one.
    ///
    /// A sticker requested on several lines is checked against its stock
    /// cumulatively. The first failing line rejects the whole order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidSticker`] for a sticker missing from the
    /// snapshot and [`OrderError::InsufficientStock`] when the running
    /// quantity for a sticker exceeds its stock. A total above
    /// [`MAX_ORDER_TOTAL`] gives [`OrderError::TotalTooLarge`].
    pub fn plan(&self, requests: &[OrderLineRequest]) -> Result<OrderPlan, OrderError> {
        let mut reserved: HashMap<StickerId, u32> = HashMap::new();
        let mut lines = Vec::with_capacity(requests.len());
        let mut total = Decimal::ZERO;

        for request in requests {
            let snapshot = self
                .catalog
                .get(&request.sticker_id)
                .ok_or(OrderError::InvalidSticker(request.sticker_id))?;

            let already = reserved.get(&request.sticker_id).copied().unwrap_or(0);
            let wanted = already.saturating_add(request.quantity);
            if wanted > snapshot.stock {
                return Err(OrderError::InsufficientStock {
                    sticker_id: snapshot.sticker_id,
                    title: snapshot.title.clone(),
                    requested: wanted,
                    available: snapshot.stock,
                });
            }
            reserved.insert(request.sticker_id, wanted);

            let line = OrderLine {
                sticker_id: snapshot.sticker_id,
                title: snapshot.title.clone(),
                unit_price: snapshot.price,
                quantity: request.quantity,
            };
            total += line.line_total();
            lines.push(line);
        }

        if total > MAX_ORDER_TOTAL {
            return Err(OrderError::TotalTooLarge {
                max: MAX_ORDER_TOTAL,
            });
        }

        let mut reservations: Vec<_> = reserved.into_iter().collect();
        reservations.sort_unstable_by_key(|(sticker_id, _)| *sticker_id);

        Ok(OrderPlan {
            lines,
            total,
            reservations,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const A: StickerId = StickerId::new(1);
    const B: StickerId = StickerId::new(2);

    fn snapshot(id: StickerId, price: &str, stock: u32) -> StockSnapshot {
        StockSnapshot {
            sticker_id: id,
            title: format!("Sticker {id}"),
            price: price.parse().unwrap(),
            stock,
        }
    }

    fn line(id: StickerId, quantity: u32) -> OrderLineRequest {
        OrderLineRequest {
            sticker_id: id,
            quantity,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            state: "IL".to_owned(),
            postal_code: "62701".to_owned(),
            country: "USA".to_owned(),
        }
    }

    #[test]
    fn test_plan_prices_and_reserves() {
        let catalog = [snapshot(A, "100", 2)];
        let plan = OrderPlanner::new(&catalog).plan(&[line(A, 2)]).unwrap();

        assert_eq!(plan.total, Decimal::from(200));
        assert_eq!(plan.reservations, vec![(A, 2)]);
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].line_total(), Decimal::from(200));
    }

    #[test]
    fn test_plan_total_is_sum_of_lines() {
        let catalog = [snapshot(A, "2.50", 10), snapshot(B, "4.99", 10)];
        let plan = OrderPlanner::new(&catalog)
            .plan(&[line(B, 3), line(A, 2)])
            .unwrap();

        assert_eq!(plan.total, Decimal::new(1997, 2));
        assert_eq!(plan.reservations, vec![(A, 2), (B, 3)]);
        assert_eq!(plan.lines[0].sticker_id, B);
    }

    #[test]
    fn test_plan_rejects_over_stock() {
        let catalog = [snapshot(A, "100", 0)];
        let err = OrderPlanner::new(&catalog).plan(&[line(A, 1)]).unwrap_err();

        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 1,
                available: 0,
                ..
            }
        ));
        assert!(err.to_string().starts_with("Insufficient stock"));
    }

    #[test]
    fn test_plan_rejects_unknown_sticker() {
        let catalog = [snapshot(A, "100", 5)];
        let err = OrderPlanner::new(&catalog)
            .plan(&[line(A, 1), line(B, 1)])
            .unwrap_err();
        assert_eq!(err, OrderError::InvalidSticker(B));
    }

    #[test]
    fn test_first_failing_line_wins() {
        let catalog = [snapshot(A, "1", 0)];
        let err = OrderPlanner::new(&catalog)
            .plan(&[line(B, 1), line(A, 1)])
            .unwrap_err();
        assert_eq!(err, OrderError::InvalidSticker(B));
    }

    #[test]
    fn test_duplicate_lines_count_against_stock_together() {
        let catalog = [snapshot(A, "100", 2)];
        let err = OrderPlanner::new(&catalog)
            .plan(&[line(A, 1), line(A, 2)])
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));

        let plan = OrderPlanner::new(&catalog)
            .plan(&[line(A, 1), line(A, 1)])
            .unwrap();
        assert_eq!(plan.reservations, vec![(A, 2)]);
        assert_eq!(plan.lines.len(), 2);
    }

    #[test]
    fn test_total_bounded_by_column() {
        assert_eq!(MAX_ORDER_TOTAL.to_string(), "9999999999.99");

        let catalog = [snapshot(A, "99999999", 1000), snapshot(B, "0.01", 1000)];
        let plan = OrderPlanner::new(&catalog)
            .plan(&[line(A, 100), line(B, 9)])
            .unwrap();
        assert_eq!(plan.total, Decimal::new(999_999_990_009, 2));

        let err = OrderPlanner::new(&catalog)
            .plan(&[line(A, 100), line(A, 1)])
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::TotalTooLarge {
                max: MAX_ORDER_TOTAL
            }
        );
    }

    #[test]
    fn test_line_request_quantity() {
        assert!(OrderLineRequest::new(0, A, 1).is_ok());
        assert_eq!(
            OrderLineRequest::new(3, A, 0),
            Err(OrderError::InvalidQuantity { index: 3 })
        );
        assert_eq!(
            OrderLineRequest::new(0, A, -2),
            Err(OrderError::InvalidQuantity { index: 0 })
        );
    }

    #[test]
    fn test_validate_request() {
        assert_eq!(
            validate_request(&[], &address()),
            Err(OrderError::EmptyItems)
        );
        assert!(validate_request(&[line(A, 1)], &address()).is_ok());

        let incomplete = ShippingAddress {
            city: String::new(),
            ..address()
        };
        assert_eq!(
            validate_request(&[line(A, 1)], &incomplete),
            Err(OrderError::InvalidAddress(AddressError::MissingField("city")))
        );
    }

    #[test]
    fn test_validate_request_caps_lines() {
        let lines = vec![line(A, 1); MAX_ORDER_LINES + 1];
        assert!(matches!(
            validate_request(&lines, &address()),
            Err(OrderError::TooManyItems { .. })
        ));
    }
}
