//! User repository for database operations.
//!
//! Accounts, password hashes and the single pending OTP per user.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sticker_shop_core::{Email, UserId, UserRole};

use super::{RepositoryError, conflict_on_unique};
use crate::models::user::{PendingOtp, User};

/// Row type for `storefront.user` queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    role: UserRole,
    phone: Option<String>,
    google_id: Option<String>,
    profile_picture: Option<String>,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            role: row.role,
            phone: row.phone,
            google_id: row.google_id,
            profile_picture: row.profile_picture,
            email_verified: row.email_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Validated signup fields.
#[derive(Debug, Clone)]
pub struct SignupRecord {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub password_hash: String,
}

/// Profile returned by Google for a verified ID token.
#[derive(Debug, Clone)]
pub struct GoogleAccount {
    pub subject: String,
    pub email: Email,
    pub name: String,
    pub picture: Option<String>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, role, phone, google_id, profile_picture,
                   email_verified, created_at, updated_at
            FROM storefront.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, role, phone, google_id, profile_picture,
                   email_verified, created_at, updated_at
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Get the password hash for a user, if they have one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM storefront.user WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(hash.flatten())
    }

    /// Create an unverified account, or refresh one that was never verified.
    ///
    /// The name, phone and password hash of an unverified account are replaced
    /// and a fresh OTP is attached. A verified account with the same email is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a verified account already uses
    /// the email.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert_pending_signup(
        &self,
        record: &SignupRecord,
        otp: &PendingOtp,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO storefront.user
                (name, email, phone, password_hash, otp_code, otp_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                password_hash = EXCLUDED.password_hash,
                otp_code = EXCLUDED.otp_code,
                otp_expires_at = EXCLUDED.otp_expires_at,
                updated_at = now()
            WHERE storefront.user.email_verified = FALSE
            RETURNING id, name, email, role, phone, google_id, profile_picture,
                      email_verified, created_at, updated_at
            ",
        )
        .bind(&record.name)
        .bind(record.email.as_str())
        .bind(&record.phone)
        .bind(&record.password_hash)
        .bind(&otp.code)
        .bind(otp.expires_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or_else(|| RepositoryError::Conflict("email already registered".to_owned()))
    }

    /// Replace the pending OTP for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_otp(&self, id: UserId, otp: &PendingOtp) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.user
            SET otp_code = $2, otp_expires_at = $3, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&otp.code)
        .bind(otp.expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get the pending OTP for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_otp(&self, id: UserId) -> Result<Option<PendingOtp>, RepositoryError> {
        let row: Option<(Option<String>, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT otp_code, otp_expires_at FROM storefront.user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(match row {
            Some((Some(code), Some(expires_at))) => Some(PendingOtp { code, expires_at }),
            _ => None,
        })
    }

    /// Mark the account verified and clear its OTP, but only if `code` is
    /// still the pending, unexpired one.
    ///
    /// Returns `None` when the code does not match, so a code can be redeemed
    /// at most once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn redeem_otp(&self, id: UserId, code: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE storefront.user
            SET email_verified = TRUE,
                otp_code = NULL,
                otp_expires_at = NULL,
                updated_at = now()
            WHERE id = $1 AND otp_code = $2 AND otp_expires_at > now()
            RETURNING id, name, email, role, phone, google_id, profile_picture,
                      email_verified, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(code)
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Find the account for a Google identity, creating it on first sign-in.
    ///
    /// An existing account with the same email is linked to the Google
    /// identity and marked verified. If that account was never verified its
    /// password hash and OTP are discarded, since Google has now proven who
    /// owns the mailbox.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the Google identity is already
    /// linked to a different account.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert_google(&self, account: &GoogleAccount) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO storefront.user
                (name, email, google_id, profile_picture, email_verified)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (email) DO UPDATE
            SET google_id = COALESCE(storefront.user.google_id, EXCLUDED.google_id),
                profile_picture = COALESCE(EXCLUDED.profile_picture, storefront.user.profile_picture),
                password_hash = CASE WHEN storefront.user.email_verified
                                     THEN storefront.user.password_hash END,
                otp_code = NULL,
                otp_expires_at = NULL,
                email_verified = TRUE,
                updated_at = now()
            RETURNING id, name, email, role, phone, google_id, profile_picture,
                      email_verified, created_at, updated_at
            ",
        )
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(&account.subject)
        .bind(account.picture.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "google account"))?;

        User::try_from(row)
    }

    /// Change the role of the account with `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account uses the email.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE storefront.user
            SET role = $2, updated_at = now()
            WHERE email = $1
            RETURNING id, name, email, role, phone, google_id, profile_picture,
                      email_verified, created_at, updated_at
            ",
        )
        .bind(email.as_str())
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
        .and_then(User::try_from)
    }
}
