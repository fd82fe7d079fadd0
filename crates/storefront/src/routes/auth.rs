//! Authentication route handlers.
//!
//! Signup and OTP login both end in `verify-otp`, which is the only place an
//! account becomes verified. Password and Google login issue a token
//! directly.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::UserProfile;
use crate::routes::extract::{ApiJson, non_blank};
use crate::services::auth::{AuthService, OtpIssued, SignedIn, SignupInput};
use crate::services::email::OtpDelivery;
use crate::state::AppState;

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GoogleLoginRequest {
    pub token: Option<String>,
}

/// Reply to any request that issues a passcode.
///
/// `otp` is only present when the email could not be sent.
#[derive(Debug, Serialize)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl OtpResponse {
    fn from_issued(issued: OtpIssued, sent: &str, fallback_prefix: &str) -> Self {
        match issued.delivery {
            OtpDelivery::Sent => Self {
                success: true,
                message: sent.to_string(),
                otp: None,
            },
            OtpDelivery::Fallback(code) => Self {
                success: true,
                message: format!("{fallback_prefix}Use this OTP: {code}"),
                otp: Some(code),
            },
        }
    }
}

/// Reply to a successful sign-in.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

impl SessionResponse {
    fn new(signed_in: &SignedIn, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            token: signed_in.token.clone(),
            user: UserProfile::from(&signed_in.user),
        }
    }
}

fn require_email(email: Option<&str>) -> Result<&str> {
    non_blank(email).ok_or_else(|| AppError::BadRequest("Email is required".to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<Json<OtpResponse>> {
    let issued = AuthService::from_state(&state)
        .signup(&SignupInput {
            name: req.name,
            email: req.email,
            password: req.password,
            phone: req.phone,
        })
        .await?;

    Ok(Json(OtpResponse::from_issued(
        issued,
        "OTP sent to your email for verification",
        "Account created! Email service temporarily unavailable. ",
    )))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Json<OtpResponse>> {
    let email = require_email(req.email.as_deref())?;
    let issued = AuthService::from_state(&state)
        .request_login_otp(email)
        .await?;

    Ok(Json(OtpResponse::from_issued(
        issued,
        "OTP sent to your email",
        "Email service temporarily unavailable. ",
    )))
}

/// POST /api/auth/resend-otp
pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Json<OtpResponse>> {
    let email = require_email(req.email.as_deref())?;
    let issued = AuthService::from_state(&state).resend_otp(email).await?;

    Ok(Json(OtpResponse::from_issued(
        issued,
        "OTP resent to your email",
        "Email service temporarily unavailable. ",
    )))
}

/// POST /api/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyOtpRequest>,
) -> Result<Json<SessionResponse>> {
    let (Some(email), Some(otp)) = (non_blank(req.email.as_deref()), non_blank(req.otp.as_deref()))
    else {
        return Err(AppError::BadRequest(
            "Please provide both email and OTP".to_string(),
        ));
    };

    let signed_in = AuthService::from_state(&state).verify_otp(email, otp).await?;
    Ok(Json(SessionResponse::new(
        &signed_in,
        "OTP verified successfully",
    )))
}

/// POST /api/auth/login-password
pub async fn login_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordLoginRequest>,
) -> Result<Json<SessionResponse>> {
    let email = require_email(req.email.as_deref())?;
    let password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Password is required".to_string()))?;

    let signed_in = AuthService::from_state(&state)
        .login_with_password(email, password)
        .await?;
    Ok(Json(SessionResponse::new(&signed_in, "Login successful")))
}

/// POST /api/auth/google
pub async fn google(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GoogleLoginRequest>,
) -> Result<Json<SessionResponse>> {
    let signed_in = AuthService::from_state(&state)
        .google_login(req.token.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(SessionResponse::new(
        &signed_in,
        "Google login successful",
    )))
}
