//! Account email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("Email is required")]
    Empty,

    #[error("Email must be at most {max} characters")]
    TooLong { max: usize },

    /// Anything that is not `local@domain.tld` with no spaces.
    #[error("Please provide a valid email address")]
    Malformed,
}

/// A normalized email address: trimmed and lowercased.
///
/// Accounts are keyed on this value, so `Asha@Example.com` and
/// `asha@example.com` name the same account.
///
/// ```
/// use sticker_shop_core::Email;
///
/// let email = Email::parse(" Asha@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "asha@example.com");
/// assert_eq!(email.local_part(), "asha");
///
/// assert!(Email::parse("asha@localhost").is_err());
/// assert!(Email::parse("asha example@x.io").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Normalize and validate an address.
    ///
    /// Accepts one `@`, a non-empty local part, and a domain with a dot
    /// that is neither its first nor last character.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] for blank, overlong or malformed input.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.contains(char::is_whitespace) {
            return Err(EmailError::Malformed);
        }

        let (local, domain) = trimmed.split_once('@').ok_or(EmailError::Malformed)?;
        let dotted = domain
            .find('.')
            .is_some_and(|i| i > 0 && !domain.ends_with('.'));
        if local.is_empty() || domain.contains('@') || !dotted {
            return Err(EmailError::Malformed);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the `@`. Used as a display name fallback.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // Rows were normalized on the way in.
        <String as sqlx::Decode<sqlx::Postgres>>::decode(value).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_shapes() {
        for ok in [
            "asha@example.com",
            "first.last+stickers@mail.example.co.in",
            "a@b.c",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_normalizes() {
        let email = Email::parse("\tRavi.K@Gmail.COM\n").unwrap();
        assert_eq!(email.as_str(), "ravi.k@gmail.com");
        assert_eq!(email, "ravi.k@gmail.com".parse().unwrap());
        assert_eq!(email.to_string(), "ravi.k@gmail.com");
    }

    #[test]
    fn test_rejects_blank_and_overlong() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        let long = format!("{}@example.com", "x".repeat(250));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "no-at-sign",
            "@example.com",
            "asha@",
            "asha@localhost",
            "asha@.com",
            "asha@example.",
            "a@b@example.com",
            "asha k@example.com",
        ] {
            assert_eq!(Email::parse(bad), Err(EmailError::Malformed), "{bad}");
        }
    }

    #[test]
    fn test_local_part() {
        let email = Email::parse("meera@example.com").unwrap();
        assert_eq!(email.local_part(), "meera");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("meera@example.com").unwrap();
        assert_eq!(
            serde_json::to_value(&email).unwrap(),
            serde_json::json!("meera@example.com")
        );
    }
}
