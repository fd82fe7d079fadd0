//! Authentication service.
//!
//! Email accounts sign up with a password and confirm their address with a
//! one-time passcode. Afterwards they can sign in with either a fresh passcode
//! or the password. Google accounts sign in with an ID token. Every path ends
//! in the same bearer token.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::instrument;

use sticker_shop_core::Email;

use crate::db::RepositoryError;
use crate::db::users::{SignupRecord, UserRepository};
use crate::models::user::{PendingOtp, User};
use crate::services::email::{EmailService, OtpDelivery, deliver_otp, generate_otp_code};
use crate::services::google::GoogleVerifier;
use crate::state::AppState;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum display name length.
const MIN_NAME_LENGTH: usize = 2;

/// Maximum display name length.
const MAX_NAME_LENGTH: usize = 100;

/// Allowed phone number length range.
const PHONE_LENGTH: std::ops::RangeInclusive<usize> = 10..=15;

/// Signup request fields as received.
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// A passcode was issued to `user`.
#[derive(Debug, Clone)]
pub struct OtpIssued {
    pub user: User,
    pub delivery: OtpDelivery,
}

/// A signed-in user and their bearer token.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: String,
    pub user: User,
}

/// Authentication service.
///
/// Handles signup, passcode and password login, and Google sign-in.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenSigner,
    mailer: Option<&'a EmailService>,
    google: Option<&'a GoogleVerifier>,
    otp_ttl: Duration,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(
        pool: &'a PgPool,
        tokens: &'a TokenSigner,
        mailer: Option<&'a EmailService>,
        google: Option<&'a GoogleVerifier>,
        otp_ttl: Duration,
    ) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
            mailer,
            google,
            otp_ttl,
        }
    }

    /// Create an authentication service wired to the application state.
    #[must_use]
    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.pool(),
            state.tokens(),
            state.email(),
            state.google(),
            Duration::minutes(state.config().otp_ttl_minutes),
        )
    }

    // =========================================================================
    // Passcode Authentication
    // =========================================================================

    /// Register (or re-register) an unverified account and send it a passcode.
    ///
    /// Signing up again before verifying replaces the pending details.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad fields.
    /// Returns `AuthError::EmailInUse` if a verified account has the email.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn signup(&self, input: &SignupInput) -> Result<OtpIssued, AuthError> {
        let name = validate_name(&input.name)?;
        let email = Email::parse(&input.email)?;
        let phone = validate_phone(&input.phone)?;
        validate_password(&input.password)?;

        let record = SignupRecord {
            name,
            email,
            phone,
            password_hash: hash_password(&input.password)?,
        };
        let otp = self.new_otp();

        let user = self
            .users
            .upsert_pending_signup(&record, &otp)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailInUse,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "signup pending verification");
        Ok(self.dispatch(user, &otp).await)
    }

    /// Send a login passcode to a verified account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotVerifiedOrUnknown` if no verified account has
    /// the email.
    #[instrument(skip(self))]
    pub async fn request_login_otp(&self, email: &str) -> Result<OtpIssued, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .filter(|user| user.email_verified)
            .ok_or(AuthError::NotVerifiedOrUnknown)?;

        let otp = self.new_otp();
        self.users.set_otp(user.id, &otp).await?;
        Ok(self.dispatch(user, &otp).await)
    }

    /// Replace the pending passcode of any account and send the new one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has the email.
    #[instrument(skip(self))]
    pub async fn resend_otp(&self, email: &str) -> Result<OtpIssued, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let otp = self.new_otp();
        self.users.set_otp(user.id, &otp).await?;
        Ok(self.dispatch(user, &otp).await)
    }

    /// Redeem a passcode, verifying the account, and issue a token.
    ///
    /// A passcode works once and only until it expires.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOtp` if the email is unknown or the code is
    /// wrong, used or expired.
    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<SignedIn, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidOtp)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        let user = self
            .users
            .redeem_otp(user.id, code.trim())
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        tracing::info!(user_id = %user.id, "passcode redeemed");
        self.sign_in(user)
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Sign in a verified account with its password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown email,
    /// `AuthError::NotVerified` before verification and
    /// `AuthError::InvalidPassword` for a wrong password or an account
    /// without one.
    #[instrument(skip(self, password))]
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AuthError> {
        let email = Email::parse(email)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.email_verified {
            return Err(AuthError::NotVerified);
        }

        let hash = self
            .users
            .get_password_hash(user.id)
            .await?
            .ok_or(AuthError::InvalidPassword)?;
        verify_password(password, &hash)?;

        self.sign_in(user)
    }

    // =========================================================================
    // Google Authentication
    // =========================================================================

    /// Sign in with a Google ID token, creating the account on first use.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::GoogleTokenMissing` for a blank token,
    /// `AuthError::GoogleNotConfigured` without a client id and
    /// `AuthError::GoogleRejected` if Google does not accept the token.
    #[instrument(skip(self, id_token))]
    pub async fn google_login(&self, id_token: &str) -> Result<SignedIn, AuthError> {
        let id_token = id_token.trim();
        if id_token.is_empty() {
            return Err(AuthError::GoogleTokenMissing);
        }
        let google = self.google.ok_or(AuthError::GoogleNotConfigured)?;

        let account = google.verify(id_token).await.map_err(|e| {
            tracing::warn!(error = %e, "Google token verification failed");
            AuthError::GoogleRejected
        })?;

        let user = self
            .users
            .upsert_google(&account)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::GoogleAccountInUse,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Google sign-in");
        self.sign_in(user)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn new_otp(&self) -> PendingOtp {
        PendingOtp {
            code: generate_otp_code(),
            expires_at: Utc::now() + self.otp_ttl,
        }
    }

    async fn dispatch(&self, user: User, otp: &PendingOtp) -> OtpIssued {
        let delivery = deliver_otp(
            self.mailer,
            user.email.as_str(),
            &otp.code,
            self.otp_ttl.num_minutes(),
        )
        .await;
        OtpIssued { user, delivery }
    }

    fn sign_in(&self, user: User) -> Result<SignedIn, AuthError> {
        let token = self.tokens.issue(user.id, user.role)?;
        Ok(SignedIn { token, user })
    }
}

fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    let length = name.chars().count();
    if length < MIN_NAME_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "Name must be at least {MIN_NAME_LENGTH} characters"
        )));
    }
    if length > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

fn validate_phone(phone: &str) -> Result<String, AuthError> {
    let phone = phone.trim();
    if !PHONE_LENGTH.contains(&phone.chars().count()) {
        return Err(AuthError::InvalidInput(format!(
            "Phone must be between {} and {} characters",
            PHONE_LENGTH.start(),
            PHONE_LENGTH.end()
        )));
    }
    Ok(phone.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidPassword)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidPassword)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("stickers!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("stickers!", &hash).is_ok());
        assert!(matches!(
            verify_password("stickers?", &hash),
            Err(AuthError::InvalidPassword)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_password() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(AuthError::InvalidPassword)
        ));
    }

    #[test]
    fn test_password_minimum() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name(" A ").is_err());
        assert_eq!(validate_name("  Al ").unwrap(), "Al");
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_phone_rules() {
        assert!(validate_phone("123456789").is_err());
        assert_eq!(validate_phone(" 9876543210 ").unwrap(), "9876543210");
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("1234567890123456").is_err());
    }
}
