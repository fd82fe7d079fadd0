//! Sticker Shop storefront library.
//!
//! The HTTP API of the shop: accounts with one-time passcode login, the
//! sticker catalog, per-user carts and orders. The binary in `main.rs` only
//! wires configuration, telemetry and the listener around [`routes::app`];
//! the CLI and the integration tests reuse the rest.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
