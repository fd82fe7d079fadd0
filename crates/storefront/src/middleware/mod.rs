//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Rate limiting (governor), on `/api/auth` and optionally the whole API
//!
//! Authentication is not a layer: handlers opt in with the [`RequireUser`] and
//! [`RequireAdmin`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAdmin, RequireUser};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter, json_rate_limit_response};
pub use request_id::{RequestId, request_id_middleware};
