//! Google sign-in.
//!
//! ID tokens from the browser are checked against Google's `tokeninfo`
//! endpoint. The token must be issued for our OAuth client and carry a
//! verified email.

use serde::Deserialize;
use thiserror::Error;

use sticker_shop_core::{Email, EmailError};

use crate::config::GoogleConfig;
use crate::db::users::GoogleAccount;

/// Errors from verifying a Google ID token.
#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token rejected by Google (status {0})")]
    Rejected(u16),

    #[error("token issued for another client")]
    AudienceMismatch,

    #[error("Google email not verified")]
    EmailNotVerified,

    #[error("invalid email in token: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// `tokeninfo` returns booleans as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(value) => value.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: String,
    email_verified: Option<Flag>,
    name: Option<String>,
    picture: Option<String>,
}

impl TokenInfo {
    fn into_account(self, client_id: &str) -> Result<GoogleAccount, GoogleError> {
        if self.aud != client_id {
            return Err(GoogleError::AudienceMismatch);
        }
        if !self.email_verified.as_ref().is_some_and(Flag::is_set) {
            return Err(GoogleError::EmailNotVerified);
        }

        let email = Email::parse(&self.email)?;
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.local_part().to_owned());

        Ok(GoogleAccount {
            subject: self.sub,
            email,
            name,
            picture: self.picture,
        })
    }
}

/// Verifies Google ID tokens.
#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    client: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
}

impl GoogleVerifier {
    #[must_use]
    pub fn new(config: &GoogleConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            tokeninfo_url: config.tokeninfo_url.clone(),
        }
    }

    /// Verify `id_token` and return the Google profile it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError` if Google rejects the token or its claims do not
    /// match this client.
    pub async fn verify(&self, id_token: &str) -> Result<GoogleAccount, GoogleError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GoogleError::Rejected(status.as_u16()));
        }

        let info: TokenInfo = response.json().await?;
        info.into_account(&self.client_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info(json: &str) -> TokenInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accepts_matching_audience() {
        let account = info(
            r#"{"aud":"client-1","sub":"1234","email":"Ada@Example.com",
                "email_verified":"true","name":"Ada","picture":"https://img/ada.png"}"#,
        )
        .into_account("client-1")
        .unwrap();

        assert_eq!(account.subject, "1234");
        assert_eq!(account.email.as_str(), "ada@example.com");
        assert_eq!(account.name, "Ada");
        assert_eq!(account.picture.as_deref(), Some("https://img/ada.png"));
    }

    #[test]
    fn test_rejects_other_audience() {
        let result = info(
            r#"{"aud":"someone-else","sub":"1","email":"a@example.com","email_verified":true}"#,
        )
        .into_account("client-1");
        assert!(matches!(result, Err(GoogleError::AudienceMismatch)));
    }

    #[test]
    fn test_rejects_unverified_email() {
        let result = info(
            r#"{"aud":"client-1","sub":"1","email":"a@example.com","email_verified":"false"}"#,
        )
        .into_account("client-1");
        assert!(matches!(result, Err(GoogleError::EmailNotVerified)));
    }

    #[test]
    fn test_name_falls_back_to_local_part() {
        let account = info(
            r#"{"aud":"client-1","sub":"1","email":"grace@example.com","email_verified":true}"#,
        )
        .into_account("client-1")
        .unwrap();
        assert_eq!(account.name, "grace");
    }
}
