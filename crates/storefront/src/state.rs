//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use url::Url;

use crate::config::StorefrontConfig;
use crate::services::auth::TokenSigner;
use crate::services::email::EmailService;
use crate::services::google::GoogleVerifier;
use crate::services::media::MediaService;

/// Timeout for calls to the image CDN and Google.
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(15);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL in {setting}: {source}")]
    InvalidUrl {
        setting: &'static str,
        source: url::ParseError,
    },
}

/// Reject endpoint overrides that are not absolute URLs.
fn check_url(setting: &'static str, value: &str) -> Result<(), StateError> {
    Url::parse(value)
        .map(drop)
        .map_err(|source| StateError::InvalidUrl { setting, source })
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    tokens: TokenSigner,
    email: Option<EmailService>,
    media: Option<MediaService>,
    google: Option<GoogleVerifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Optional integrations (SMTP, image storage, Google sign-in) are only
    /// constructed when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or HTTP client cannot be built, or
    /// if an endpoint override is not a valid URL.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        if let Some(media) = &config.media {
            check_url("CLOUDINARY_API_BASE", &media.api_base)?;
        }
        if let Some(google) = &config.google {
            check_url("GOOGLE_TOKENINFO_URL", &google.tokeninfo_url)?;
        }

        let http = reqwest::Client::builder()
            .timeout(OUTBOUND_TIMEOUT)
            .user_agent(concat!("sticker-shop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = TokenSigner::new(
            config.token_secret.clone(),
            chrono::Duration::days(config.token_ttl_days),
        );
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        let media = config
            .media
            .as_ref()
            .map(|media| MediaService::new(media, http.clone()));
        let google = config
            .google
            .as_ref()
            .map(|google| GoogleVerifier::new(google, http));

        if email.is_none() {
            tracing::warn!("SMTP not configured, OTPs will be returned in responses");
        }
        if media.is_none() {
            tracing::warn!("Cloudinary not configured, sticker uploads are disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                email,
                media,
                google,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the bearer token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Get the SMTP mailer, if configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Get the image CDN client, if configured.
    #[must_use]
    pub fn media(&self) -> Option<&MediaService> {
        self.inner.media.as_ref()
    }

    /// Get the Google token verifier, if configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleVerifier> {
        self.inner.google.as_ref()
    }
}
