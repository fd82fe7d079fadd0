//! Database operations for the storefront `PostgreSQL` schema.
//!
//! ## Tables (schema `storefront`)
//!
//! - `user` - Accounts, password hashes and the pending OTP
//! - `sticker` - The catalog, including stock counts
//! - `cart` - One row per user holding the cart lines as JSONB
//! - `customer_order` / `order_item` - Placed orders and their frozen lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sticker-shop-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod carts;
pub mod orders;
pub mod stickers;
pub mod users;

pub use carts::CartRepository;
pub use orders::{OrderRepository, PlacementError, StatusChangeError};
pub use stickers::StickerRepository;
pub use users::{SignupRecord, UserRepository};

/// Embedded storefront migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `RepositoryError::Conflict`.
fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Convert a non-negative count column.
fn to_count(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a count for binding to an `INTEGER` column.
fn from_count(value: u32, column: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{column} out of range: {value}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_conversions() {
        assert_eq!(to_count(3, "stock").ok(), Some(3));
        assert!(matches!(
            to_count(-1, "stock"),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert_eq!(from_count(7, "stock").ok(), Some(7));
        assert!(from_count(u32::MAX, "stock").is_err());
    }
}
