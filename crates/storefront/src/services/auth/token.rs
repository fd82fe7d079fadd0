//! Bearer tokens.
//!
//! A token is `base64url(claims).base64url(hmac)` where the claims are a JSON
//! object `{sub, role, exp}` and the MAC is HMAC-SHA256 over the encoded
//! claims. The role is informational; the auth extractor re-reads it from the
//! database on every request.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use sticker_shop_core::{UserId, UserRole};

type HmacSha256 = Hmac<Sha256>;

/// Errors from issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("failed to encode claims: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid signing key")]
    Key,
}

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account the token was issued to.
    pub sub: UserId,
    /// Role at issuance time.
    pub role: UserRole,
    /// Expiry as a Unix timestamp in seconds.
    pub exp: i64,
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a token for `user_id` valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if the claims cannot be serialized.
    pub fn issue(&self, user_id: UserId, role: UserRole) -> Result<String, TokenError> {
        self.issue_at(user_id, role, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if the claims cannot be serialized.
    pub fn issue_at(
        &self,
        user_id: UserId,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            role,
            exp: (now + self.ttl).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(payload.as_bytes())?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed`, `TokenError::BadSignature` or
    /// `TokenError::Expired`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenSigner::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        self.mac(payload.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TokenError::Malformed)?;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, TokenError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)?;
        mac.update(data);
        Ok(mac)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            SecretString::from("k3y-for-t0ken-tests-xxxxxxxxxxxxxxxxxx"),
            Duration::days(30),
        )
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let token = signer.issue(UserId::new(7), UserRole::Admin).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, UserId::new(7));
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let issued = Utc::now() - Duration::days(31);
        let token = signer.issue_at(UserId::new(1), UserRole::User, issued).unwrap();
        assert!(matches!(signer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().issue(UserId::new(1), UserRole::User).unwrap();
        let other = TokenSigner::new(
            SecretString::from("a-different-secret-yyyyyyyyyyyyyyyyyyy"),
            Duration::days(30),
        );
        assert!(matches!(other.verify(&token), Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer();
        let token = signer.issue(UserId::new(1), UserRole::User).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged = Claims {
            sub: UserId::new(1),
            role: UserRole::Admin,
            exp: i64::MAX,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{payload}.{signature}");

        assert!(matches!(
            signer.verify(&tampered),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = signer();
        assert!(matches!(signer.verify("nope"), Err(TokenError::Malformed)));
        assert!(matches!(
            signer.verify("abc.!!!"),
            Err(TokenError::Malformed)
        ));
    }
}
