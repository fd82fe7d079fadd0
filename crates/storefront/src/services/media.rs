//! Sticker image storage on Cloudinary.
//!
//! Uploads and deletions use Cloudinary's signed Upload API: the request
//! parameters are sorted, joined as `k=v&k=v`, suffixed with the API secret
//! and hashed with SHA-256.

use std::collections::BTreeMap;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::MediaConfig;
use crate::models::ImageRef;

/// Errors from the image CDN.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

/// An image received from the client, not yet stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Cloudinary client.
#[derive(Clone)]
pub struct MediaService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl std::fmt::Debug for MediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaService")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

impl MediaService {
    #[must_use]
    pub fn new(config: &MediaConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/{}/image",
                config.api_base.trim_end_matches('/'),
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        }
    }

    /// Store an image and return where it lives.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidUpload` for an empty or non-image file and
    /// `MediaError::Api` if Cloudinary refuses the upload.
    pub async fn upload(&self, image: ImageUpload) -> Result<ImageRef, MediaError> {
        if image.bytes.is_empty() {
            return Err(MediaError::InvalidUpload("image file is empty".to_owned()));
        }
        if !image.content_type.starts_with("image/") {
            return Err(MediaError::InvalidUpload(format!(
                "expected an image, got {}",
                image.content_type
            )));
        }

        let timestamp = unix_timestamp();
        let params = BTreeMap::from([
            ("folder", self.folder.clone()),
            ("timestamp", timestamp.clone()),
        ]);
        let signature = sign(&params, &self.api_secret);

        let file = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("folder", self.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(format!("{}/upload", self.endpoint))
            .multipart(form)
            .send()
            .await?;

        let uploaded: UploadResponse = parse_response(response).await?;
        tracing::info!(public_id = %uploaded.public_id, "image uploaded");

        Ok(ImageRef {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    /// Delete a stored image by its provider id.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if the request fails or Cloudinary reports an
    /// error. An image that is already gone is not an error.
    pub async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = unix_timestamp();
        let params = BTreeMap::from([
            ("public_id", public_id.to_owned()),
            ("timestamp", timestamp.clone()),
        ]);
        let signature = sign(&params, &self.api_secret);

        let response = self
            .client
            .post(format!("{}/destroy", self.endpoint))
            .form(&[
                ("public_id", public_id),
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        let outcome: DestroyResponse = parse_response(response).await?;
        if outcome.result != "ok" && outcome.result != "not found" {
            return Err(MediaError::Api {
                status: 200,
                message: outcome.result,
            });
        }
        tracing::info!(public_id = %public_id, result = %outcome.result, "image destroyed");
        Ok(())
    }
}

/// Delete an image without failing the caller.
pub async fn destroy_quietly(media: Option<&MediaService>, public_id: &str) {
    let Some(media) = media else {
        tracing::warn!(public_id = %public_id, "media storage not configured, image left in place");
        return;
    };
    if let Err(e) = media.destroy(public_id).await {
        tracing::warn!(public_id = %public_id, error = %e, "failed to delete image");
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, MediaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(MediaError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Cloudinary request signature.
fn sign(params: &BTreeMap<&str, String>, secret: &SecretString) -> String {
    let joined = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params_and_appends_secret() {
        let secret = SecretString::from("abcd");
        let params = BTreeMap::from([
            ("timestamp", "1315060510".to_owned()),
            ("public_id", "sample_image".to_owned()),
        ]);

        let mut hasher = Sha256::new();
        hasher.update(b"public_id=sample_image&timestamp=1315060510abcd");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(sign(&params, &secret), expected);
        assert_eq!(expected.len(), 64);
    }

    #[tokio::test]
    async fn test_rejects_non_image_before_any_request() {
        let config = MediaConfig {
            cloud_name: "demo".to_owned(),
            api_key: "key".to_owned(),
            api_secret: SecretString::from("secret"),
            folder: "stickers".to_owned(),
            api_base: "http://127.0.0.1:9".to_owned(),
        };
        let media = MediaService::new(&config, reqwest::Client::new());

        let result = media
            .upload(ImageUpload {
                file_name: "notes.txt".to_owned(),
                content_type: "text/plain".to_owned(),
                bytes: b"hello".to_vec(),
            })
            .await;
        assert!(matches!(result, Err(MediaError::InvalidUpload(_))));

        let result = media
            .upload(ImageUpload {
                file_name: "empty.png".to_owned(),
                content_type: "image/png".to_owned(),
                bytes: Vec::new(),
            })
            .await;
        assert!(matches!(result, Err(MediaError::InvalidUpload(_))));
    }
}
