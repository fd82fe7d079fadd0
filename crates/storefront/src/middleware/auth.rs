//! Authentication extractors.
//!
//! Protected handlers take [`RequireUser`] or [`RequireAdmin`]. Both read the
//! `Authorization: Bearer <token>` header, verify the token and load the
//! account it names. The role is taken from the loaded account, so a demoted
//! admin loses access immediately.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

/// Extractor that requires a signed-in admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

/// Pull the token out of an `Authorization` header value.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(Self(user.clone()));
        }

        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized: No token provided".to_string()))?;

        let claims = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AppError::Unauthorized("Invalid token".to_string())
        })?;

        let user = UserRepository::new(state.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        parts.extensions.insert(user.clone());

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "admin route refused");
            return Err(AppError::Forbidden("Admin access only".to_string()));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
