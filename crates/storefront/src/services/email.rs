//! OTP mail delivery.
//!
//! Sends the one-time passcode over SMTP via lettre with Askama HTML and text
//! bodies. Delivery is best effort: callers fall back to returning the code in
//! the response when sending fails or SMTP is not configured.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Subject line of the passcode email.
pub const OTP_SUBJECT: &str = "Your OTP for Sticker Shop";

#[derive(Template)]
#[template(path = "email/otp_code.html")]
struct OtpEmailHtml<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/otp_code.txt")]
struct OtpEmailText<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// How a freshly issued OTP reached the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpDelivery {
    /// The code was emailed.
    Sent,
    /// Email was unavailable; the code must be shown to the caller.
    Fallback(String),
}

/// SMTP mailer for passcode emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a passcode email.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_otp(&self, to: &str, code: &str, ttl_minutes: i64) -> Result<(), EmailError> {
        let html = OtpEmailHtml { code, ttl_minutes }.render()?;
        let text = OtpEmailText { code, ttl_minutes }.render()?;

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(OTP_SUBJECT)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, "OTP email sent");
        Ok(())
    }
}

/// Deliver `code` by email if possible, otherwise hand it back for the
/// response body.
pub async fn deliver_otp(
    mailer: Option<&EmailService>,
    to: &str,
    code: &str,
    ttl_minutes: i64,
) -> OtpDelivery {
    let Some(mailer) = mailer else {
        tracing::warn!(to = %to, "SMTP not configured, returning OTP in response");
        return OtpDelivery::Fallback(code.to_owned());
    };

    match mailer.send_otp(to, code, ttl_minutes).await {
        Ok(()) => OtpDelivery::Sent,
        Err(e) => {
            tracing::warn!(to = %to, error = %e, "OTP email failed, returning OTP in response");
            OtpDelivery::Fallback(code.to_owned())
        }
    }
}

/// Generate a 6-digit passcode.
#[must_use]
pub fn generate_otp_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_code_format() {
        for _ in 0..100 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn test_templates_render_code_and_expiry() {
        let text = OtpEmailText {
            code: "482913",
            ttl_minutes: 10,
        }
        .render()
        .unwrap();
        assert!(text.contains("482913"));
        assert!(text.contains("10 minutes"));

        let html = OtpEmailHtml {
            code: "482913",
            ttl_minutes: 10,
        }
        .render()
        .unwrap();
        assert!(html.contains("482913"));
        assert!(html.contains(OTP_SUBJECT));
    }

    #[tokio::test]
    async fn test_missing_mailer_falls_back() {
        let delivery = deliver_otp(None, "a@example.com", "123456", 10).await;
        assert_eq!(delivery, OtpDelivery::Fallback("123456".to_owned()));
    }
}
