//! Request extractors shared by the API handlers.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body extractor whose rejection uses the API's error body.
///
/// Axum's own [`Json`] rejects with a plain-text body; the shop frontend
/// always expects `{"success": false, "message": ...}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(&rejection)),
        }
    }
}

fn rejection_to_error(rejection: &JsonRejection) -> AppError {
    tracing::debug!(error = %rejection.body_text(), "rejected JSON body");
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Expected a JSON request body".to_string())
        }
        JsonRejection::JsonDataError(e) => AppError::BadRequest(e.body_text()),
        _ => AppError::BadRequest("Malformed JSON body".to_string()),
    }
}

/// Parse a numeric id from a path segment.
///
/// # Errors
///
/// Returns `AppError::BadRequest` naming `what` if the segment is not a
/// positive integer.
pub fn parse_id<T: From<i32>>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(T::from)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {what} id")))
}

/// Treat missing and blank strings alike.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
