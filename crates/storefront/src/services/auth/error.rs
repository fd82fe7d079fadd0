//! Authentication error types.
//!
//! Display strings are shown to the client as-is, except for the database,
//! hashing and token variants which surface as a generic internal error.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("{0}")]
    InvalidEmail(#[from] sticker_shop_core::EmailError),

    /// A signup field failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// A verified account already uses the email.
    #[error("Email already in use")]
    EmailInUse,

    /// OTP login requested for an unknown or unverified account.
    #[error("User not found or not verified. Please sign up first.")]
    NotVerifiedOrUnknown,

    /// User not found.
    #[error("User not found")]
    UserNotFound,

    /// Password login before the email was verified.
    #[error("Account not verified. Please verify your email first.")]
    NotVerified,

    /// Wrong password, or the account has none.
    #[error("Invalid password")]
    InvalidPassword,

    /// The OTP does not match, was already used or has expired.
    #[error("Invalid or expired OTP")]
    InvalidOtp,

    /// Google sign-in called without a token.
    #[error("Google token missing")]
    GoogleTokenMissing,

    /// `GOOGLE_CLIENT_ID` is not set.
    #[error("Google login is not configured")]
    GoogleNotConfigured,

    /// Google did not vouch for the token.
    #[error("Invalid Google login")]
    GoogleRejected,

    /// The Google identity is linked to another account.
    #[error("Google account already linked to another user")]
    GoogleAccountInUse,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}
