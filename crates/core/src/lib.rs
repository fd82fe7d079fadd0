//! Sticker Shop Core - domain types and rules.
//!
//! This crate holds everything about the shop that can be decided without
//! touching a database or the network:
//! - [`types`] - typed ids, emails, prices, addresses and the status enums
//! - [`cart`] - merging and editing the per-user list of cart lines
//! - [`order`] - validating an order request against a catalog snapshot
//!
//! The `storefront` crate performs the I/O and calls into these rules inside
//! its repositories and services. Enable the `postgres` feature to get sqlx
//! encode/decode implementations for the types.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod types;

pub use cart::{CartError, CartLine, CartLines, MAX_LINE_QUANTITY, checked_quantity};
pub use order::{
    MAX_ORDER_LINES, MAX_ORDER_TOTAL, OrderError, OrderLine, OrderLineRequest, OrderPlan,
    OrderPlanner, StockSnapshot, validate_request,
};
pub use types::*;
