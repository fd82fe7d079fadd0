//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"success": false, "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use sticker_shop_core::{CartError, OrderError};

use crate::db::{PlacementError, RepositoryError, StatusChangeError};
use crate::services::auth::AuthError;
use crate::services::cart::CartServiceError;
use crate::services::catalog::CatalogError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid request (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Conflicts with existing state (409).
    #[error("{0}")]
    Conflict(String),

    /// Rate limited (429).
    #[error("Too many requests, please try again later")]
    RateLimited,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// External service failure (image CDN).
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Upstream(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message: &message,
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidEmail(_)
            | AuthError::InvalidInput(_)
            | AuthError::WeakPassword(_)
            | AuthError::NotVerified
            | AuthError::InvalidOtp
            | AuthError::GoogleTokenMissing
            | AuthError::GoogleNotConfigured => Self::BadRequest(message),
            AuthError::InvalidPassword | AuthError::GoogleRejected => Self::Unauthorized(message),
            AuthError::NotVerifiedOrUnknown | AuthError::UserNotFound => Self::NotFound(message),
            AuthError::EmailInUse | AuthError::GoogleAccountInUse => Self::Conflict(message),
            AuthError::Repository(e) => Self::Database(e),
            AuthError::PasswordHash | AuthError::Token(_) => Self::Internal(message),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound(_) => Self::NotFound(err.to_string()),
            CartError::InvalidQuantity | CartError::QuantityTooLarge { .. } => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<CartServiceError> for AppError {
    fn from(err: CartServiceError) -> Self {
        match err {
            CartServiceError::Cart(e) => e.into(),
            CartServiceError::StickerNotFound | CartServiceError::CartNotFound => {
                Self::NotFound(err.to_string())
            }
            CartServiceError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<PlacementError> for AppError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::Rejected(e) => e.into(),
            PlacementError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<StatusChangeError> for AppError {
    fn from(err: StatusChangeError) -> Self {
        match err {
            StatusChangeError::NotFound => Self::NotFound(err.to_string()),
            StatusChangeError::InvalidTransition { .. } => Self::BadRequest(err.to_string()),
            StatusChangeError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => Self::NotFound(err.to_string()),
            CatalogError::Invalid(_) | CatalogError::ImageRequired => {
                Self::BadRequest(err.to_string())
            }
            CatalogError::UploadsDisabled => Self::Internal(err.to_string()),
            CatalogError::Media(e) => match e {
                crate::services::media::MediaError::InvalidUpload(msg) => Self::BadRequest(msg),
                other => Self::Upstream(other.to_string()),
            },
            CatalogError::Repository(e) => Self::Database(e),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
