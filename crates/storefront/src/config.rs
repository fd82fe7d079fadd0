//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_TOKEN_TTL_DAYS` - Bearer token lifetime (default: 30)
//! - `STOREFRONT_OTP_TTL_MINUTES` - One-time passcode lifetime (default: 10)
//! - `STOREFRONT_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `STOREFRONT_STATIC_DIR` - Built SPA directory to serve at `/`
//! - `STOREFRONT_RATE_LIMIT` - Rate limit `/api/auth` (default: true)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - OTP mail delivery
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`,
//!   `CLOUDINARY_FOLDER` - Sticker image storage
//! - `GOOGLE_CLIENT_ID` - Enables Google sign-in
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing secret
    pub token_secret: SecretString,
    /// Bearer token lifetime in days
    pub token_ttl_days: i64,
    /// One-time passcode lifetime in minutes
    pub otp_ttl_minutes: i64,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Directory holding the built single-page app
    pub static_dir: Option<PathBuf>,
    /// Whether `/api/auth` is rate limited per client IP
    pub rate_limit: bool,
    /// SMTP settings; `None` puts OTP delivery in fallback mode
    pub email: Option<EmailConfig>,
    /// Image storage settings; `None` disables sticker image uploads
    pub media: Option<MediaConfig>,
    /// Google sign-in settings
    pub google: Option<GoogleConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// SMTP configuration for OTP mail.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Cloudinary image storage configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct MediaConfig {
    /// Cloudinary cloud name
    pub cloud_name: String,
    /// API key (sent with every signed request)
    pub api_key: String,
    /// API secret used to sign requests
    pub api_secret: SecretString,
    /// Folder uploads are placed in
    pub folder: String,
    /// API base URL (overridable for testing)
    pub api_base: String,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Google sign-in configuration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client ID the ID tokens must be issued for
    pub client_id: String,
    /// Token verification endpoint
    pub tokeninfo_url: String,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let token_secret = get_signing_secret("STOREFRONT_TOKEN_SECRET", MIN_TOKEN_SECRET_LENGTH)?;
        let token_ttl_days = parse_env("STOREFRONT_TOKEN_TTL_DAYS", "30")?;
        let otp_ttl_minutes = parse_env("STOREFRONT_OTP_TTL_MINUTES", "10")?;
        let cors_origins = get_optional_env("STOREFRONT_CORS_ORIGINS")
            .map(|value| parse_origin_list(&value))
            .unwrap_or_default();
        let static_dir = get_optional_env("STOREFRONT_STATIC_DIR").map(PathBuf::from);
        let rate_limit = parse_env("STOREFRONT_RATE_LIMIT", "true")?;

        let email = EmailConfig::from_env()?;
        let media = MediaConfig::from_env()?;
        let google = get_optional_env("GOOGLE_CLIENT_ID").map(|client_id| GoogleConfig {
            client_id,
            tokeninfo_url: get_env_or_default(
                "GOOGLE_TOKENINFO_URL",
                "https://oauth2.googleapis.com/tokeninfo",
            ),
        });

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            token_secret,
            token_ttl_days,
            otp_ttl_minutes,
            cors_origins,
            static_dir,
            rate_limit,
            email,
            media,
            google,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    /// SMTP is optional, but once `SMTP_HOST` is set the rest must be too.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

impl MediaConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(cloud_name) = get_optional_env("CLOUDINARY_CLOUD_NAME") else {
            return Ok(None);
        };
        Ok(Some(Self {
            cloud_name,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_signing_secret("CLOUDINARY_API_SECRET", 16)?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "stickers"),
            api_base: get_env_or_default("CLOUDINARY_API_BASE", "https://api.cloudinary.com/v1_1"),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated origin list, dropping blanks and `*`.
fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect()
}

/// Shannon entropy of the byte distribution, in bits per byte.
fn bits_per_byte(value: &str) -> f64 {
    let mut histogram = [0_u32; 256];
    for byte in value.bytes() {
        if let Some(count) = histogram.get_mut(usize::from(byte)) {
            *count += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)] // secrets are far below 2^52 bytes
    let len = value.len() as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject signing keys that are short, look copied from a sample file, or
/// repeat a few characters.
fn check_signing_secret(key: &str, value: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(key.to_string(), reason);

    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(insecure(format!(
            "appears to be a placeholder (contains '{pattern}')"
        )));
    }

    let entropy = bits_per_byte(value);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        )));
    }

    Ok(())
}

/// Load a signing secret, enforcing a minimum length on top of the
/// placeholder and entropy checks.
fn get_signing_secret(key: &str, min_len: usize) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    if value.len() < min_len {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("must be at least {min_len} characters (got {})", value.len()),
        ));
    }
    check_signing_secret(key, &value)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_byte() {
        assert!(bits_per_byte("aaaa").abs() < f64::EPSILON);
        assert!((bits_per_byte("abab") - 1.0).abs() < 1e-9);
        assert!(bits_per_byte("q8V#z1Lm!R4t@Kp0") > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_signing_secret_rejects_placeholders() {
        let err = check_signing_secret("STOREFRONT_TOKEN_SECRET", "ChangeMe-please-0192837465")
            .unwrap_err();
        assert!(err.to_string().contains("'changeme'"));
    }

    #[test]
    fn test_signing_secret_rejects_repetitive_values() {
        let err = check_signing_secret("STOREFRONT_TOKEN_SECRET", &"ab".repeat(20)).unwrap_err();
        assert!(err.to_string().contains("entropy too low"));
    }

    #[test]
    fn test_signing_secret_accepts_random_value() {
        assert!(
            check_signing_secret("STOREFRONT_TOKEN_SECRET", "Zk3!pQ9vX#t2Lm8@Wr5^Nb7&Hd1*Yc4%").is_ok()
        );
    }

    #[test]
    fn test_parse_origin_list() {
        assert_eq!(
            parse_origin_list("https://shop.example, http://localhost:5173/ ,,*"),
            vec!["https://shop.example", "http://localhost:5173"]
        );
        assert!(parse_origin_list("*").is_empty());
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.mail.test".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("hunter2-smtp-password"),
            from_address: "Sticker Shop <no-reply@shop.test>".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.mail.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2-smtp-password"));
    }

    #[test]
    fn test_media_config_debug_redacts_secret() {
        let config = MediaConfig {
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: SecretString::from("cloud-signing-value"),
            folder: "stickers".to_string(),
            api_base: "https://api.cloudinary.com/v1_1".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("demo"));
        assert!(!debug_output.contains("cloud-signing-value"));
    }
}
