//! HTTP route handlers for the shop API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database)
//! GET  /api/ping                    - "pong"
//!
//! # Auth (rate limited)
//! POST /api/auth/signup             - Create or refresh a pending account, send OTP
//! POST /api/auth/login              - Send a login OTP to a verified account
//! POST /api/auth/verify-otp         - Redeem an OTP for a token
//! POST /api/auth/resend-otp         - Issue a fresh OTP
//! POST /api/auth/login-password     - Password login
//! POST /api/auth/google             - Google ID token login
//!
//! # Stickers
//! GET    /api/stickers              - List (optional ?category=)
//! GET    /api/stickers/{id}         - Detail
//! POST   /api/stickers              - Create (admin, multipart)
//! POST   /api/stickers/create       - Create (admin, multipart)
//! PUT    /api/stickers/{id}         - Update (admin, multipart)
//! DELETE /api/stickers/{id}         - Delete (admin)
//!
//! # Cart (requires auth)
//! GET  /api/cart                    - Current cart
//! POST /api/cart/add                - Add or merge a line
//! POST /api/cart/remove             - Remove a line
//! POST /api/cart/update             - Set a line's quantity
//!
//! # Orders (requires auth)
//! POST /api/orders                  - Place an order
//! GET  /api/orders/me               - Caller's orders
//! GET  /api/orders                  - All orders (admin)
//! PUT  /api/orders/{id}/status      - Change status (admin)
//! ```
//!
//! Anything outside `/api` and `/health` is served from the frontend build
//! directory when one is configured, with `index.html` as the fallback.

pub mod auth;
pub mod cart;
pub mod extract;
pub mod orders;
pub mod stickers;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{from_fn, map_response},
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, json_rate_limit_response, request_id_middleware,
};
use crate::state::AppState;

/// Largest accepted sticker form, image included.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/login-password", post(auth::login_password))
        .route("/google", post(auth::google));

    if rate_limit {
        router
            .layer(auth_rate_limiter())
            .layer(map_response(json_rate_limit_response))
    } else {
        router
    }
}

/// Create the sticker routes router.
pub fn sticker_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stickers::list).post(stickers::create))
        .route("/create", post(stickers::create))
        .route(
            "/{id}",
            get(stickers::show)
                .put(stickers::update)
                .delete(stickers::delete),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/update", post(cart::update))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place).get(orders::list_all))
        .route("/me", get(orders::mine))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the `/api` router.
pub fn api_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/ping", get(ping))
        .nest("/auth", auth_routes(rate_limit))
        .nest("/stickers", sticker_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .fallback(api_not_found);

    if rate_limit {
        router
            .layer(api_rate_limiter())
            .layer(map_response(json_rate_limit_response))
    } else {
        router
    }
}

/// Build the complete application with every layer applied.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(&config.cors_origins);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(config.rate_limit));

    if let Some(dir) = &config.static_dir {
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured origins; any origin when none are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn ping() -> &'static str {
    "pong"
}

async fn api_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
