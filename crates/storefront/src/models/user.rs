//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sticker_shop_core::{Email, UserId, UserRole};

/// A shop account (domain type).
///
/// Password hash and OTP state stay in the repository layer and never leave it
/// attached to a `User`.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Lowercased email address.
    pub email: Email,
    /// Account role.
    pub role: UserRole,
    /// Contact phone (absent for Google accounts).
    pub phone: Option<String>,
    /// Google account subject, for users who signed in with Google.
    pub google_id: Option<String>,
    /// Avatar URL from Google.
    pub profile_picture: Option<String>,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The part of a user returned to the client after authentication.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            profile_picture: user.profile_picture.clone(),
        }
    }
}

/// Short user reference shown next to orders in admin listings.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// One-time passcode currently issued to a user.
#[derive(Debug, Clone)]
pub struct PendingOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingOtp {
    /// Whether the code can still be redeemed at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::Duration;

    use super::*;

    pub(crate) fn sample_user() -> User {
        User {
            id: UserId::new(4),
            name: "Asha".to_string(),
            email: Email::parse("asha@example.com").unwrap(),
            role: UserRole::Admin,
            phone: Some("9876543210".to_string()),
            google_id: None,
            profile_picture: None,
            email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_otp_expiry() {
        let now = Utc::now();
        let otp = PendingOtp {
            code: "123456".to_string(),
            expires_at: now + Duration::minutes(10),
        };
        assert!(otp.is_live(now));
        assert!(!otp.is_live(now + Duration::minutes(10)));
    }

    #[test]
    fn test_profile_serialization_omits_missing_picture() {
        let user = sample_user();

        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["role"], "admin");
        assert_eq!(json["email"], "asha@example.com");
        assert!(json.get("profilePicture").is_none());
        assert!(json.get("phone").is_none());
    }
}
