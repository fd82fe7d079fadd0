//! User role management commands.
//!
//! # Usage
//!
//! ```bash
//! # Grant admin access to an existing account
//! ss-cli user promote -e admin@example.com
//!
//! # Revoke it
//! ss-cli user demote -e admin@example.com
//! ```
//!
//! Roles are never assigned through the HTTP API; this is the only way to
//! create an admin.

use sticker_shop_core::{Email, EmailError, UserRole};
use sticker_shop_storefront::db::{RepositoryError, UserRepository};
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur while changing a role.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("No account with email: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Set the role of the account registered under `email`.
///
/// # Errors
///
/// Returns `UserError::NotFound` if no account uses the address.
pub async fn set_role(email: &str, role: UserRole) -> Result<(), UserError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound(email.to_string()),
            other => UserError::Repository(other),
        })?;

    tracing::info!(
        "Role updated! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    if !user.email_verified {
        tracing::warn!("Account has not verified its email yet and cannot sign in until it does.");
    }

    Ok(())
}
