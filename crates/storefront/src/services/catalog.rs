//! Sticker catalog.
//!
//! Reads are plain repository calls. Writes validate the submitted form
//! fields, push any new image to the CDN and clean up images that are no
//! longer referenced.

use sqlx::PgPool;
use thiserror::Error;

use sticker_shop_core::{Price, StickerCategory, StickerId, UserId};

use crate::db::{RepositoryError, StickerRepository};
use crate::models::{NewSticker, Sticker, StickerUpdate};
use crate::services::media::{self, ImageUpload, MediaError, MediaService};

/// Maximum title length.
const MAX_TITLE_LENGTH: usize = 200;

/// Maximum description length.
const MAX_DESCRIPTION_LENGTH: usize = 2_000;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Sticker not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    #[error("Image required")]
    ImageRequired,

    #[error("Image uploads are not configured")]
    UploadsDisabled,

    #[error("image upload failed: {0}")]
    Media(#[from] MediaError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Sticker form fields as submitted. Absent fields are `None`.
#[derive(Debug, Clone, Default)]
pub struct StickerFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub stock: Option<String>,
    pub category: Option<String>,
}

impl StickerFields {
    fn validated(&self) -> Result<StickerUpdate, CatalogError> {
        let title = self
            .title
            .as_deref()
            .map(|title| {
                let title = title.trim();
                if title.is_empty() {
                    return Err(CatalogError::Invalid("Title is required".to_owned()));
                }
                if title.chars().count() > MAX_TITLE_LENGTH {
                    return Err(CatalogError::Invalid(format!(
                        "Title must be at most {MAX_TITLE_LENGTH} characters"
                    )));
                }
                Ok(title.to_owned())
            })
            .transpose()?;

        let description = self
            .description
            .as_deref()
            .map(|description| {
                let description = description.trim();
                if description.chars().count() > MAX_DESCRIPTION_LENGTH {
                    return Err(CatalogError::Invalid(format!(
                        "Description must be at most {MAX_DESCRIPTION_LENGTH} characters"
                    )));
                }
                Ok(description.to_owned())
            })
            .transpose()?;

        let price = self
            .price
            .as_deref()
            .map(|price| {
                price
                    .parse::<Price>()
                    .map_err(|e| CatalogError::Invalid(format!("Invalid price: {e}")))
            })
            .transpose()?;

        let stock = self
            .stock
            .as_deref()
            .map(|stock| {
                stock
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|stock| i32::try_from(*stock).is_ok())
                    .ok_or_else(|| {
                        CatalogError::Invalid("Stock must be a non-negative integer".to_owned())
                    })
            })
            .transpose()?;

        let category = self
            .category
            .as_deref()
            .map(|category| {
                category.parse::<StickerCategory>().map_err(|_| {
                    CatalogError::Invalid(format!(
                        "Category must be one of: {}",
                        StickerCategory::ALL
                            .iter()
                            .map(|c| c.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })
            })
            .transpose()?;

        Ok(StickerUpdate {
            title,
            description,
            price,
            stock,
            category,
            image: None,
        })
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    stickers: StickerRepository<'a>,
    media: Option<&'a MediaService>,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, media: Option<&'a MediaService>) -> Self {
        Self {
            stickers: StickerRepository::new(pool),
            media,
        }
    }

    /// All stickers, newest first, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(
        &self,
        category: Option<StickerCategory>,
    ) -> Result<Vec<Sticker>, CatalogError> {
        Ok(self.stickers.list(category).await?)
    }

    /// One sticker by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn get(&self, id: StickerId) -> Result<Sticker, CatalogError> {
        self.stickers.get(id).await?.ok_or(CatalogError::NotFound)
    }

    /// Add a sticker. Title, price, category and an image are required;
    /// stock defaults to zero.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` or `CatalogError::ImageRequired` for a
    /// bad form and `CatalogError::Media` if the upload fails.
    pub async fn create(
        &self,
        fields: &StickerFields,
        image: Option<ImageUpload>,
        uploaded_by: UserId,
    ) -> Result<Sticker, CatalogError> {
        let validated = fields.validated()?;
        let title = validated
            .title
            .ok_or_else(|| CatalogError::Invalid("Title is required".to_owned()))?;
        let price = validated
            .price
            .ok_or_else(|| CatalogError::Invalid("Price is required".to_owned()))?;
        let category = validated
            .category
            .ok_or_else(|| CatalogError::Invalid("Category is required".to_owned()))?;
        let image = image.ok_or(CatalogError::ImageRequired)?;

        let media = self.media.ok_or(CatalogError::UploadsDisabled)?;
        let stored = media.upload(image).await?;

        let new_sticker = NewSticker {
            title,
            description: validated.description.filter(|d| !d.is_empty()),
            price,
            stock: validated.stock.unwrap_or(0),
            category,
            image: stored,
            uploaded_by: Some(uploaded_by),
        };

        match self.stickers.create(&new_sticker).await {
            Ok(sticker) => {
                tracing::info!(sticker_id = %sticker.id, "sticker created");
                Ok(sticker)
            }
            Err(e) => {
                media::destroy_quietly(Some(media), &new_sticker.image.public_id).await;
                Err(e.into())
            }
        }
    }

    /// Apply a partial update. A new image replaces the old one, which is
    /// then deleted from the CDN.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id and
    /// `CatalogError::Invalid` for a bad field.
    pub async fn update(
        &self,
        id: StickerId,
        fields: &StickerFields,
        image: Option<ImageUpload>,
    ) -> Result<Sticker, CatalogError> {
        let mut update = fields.validated()?;
        let existing = self.get(id).await?;

        if let Some(image) = image {
            let media = self.media.ok_or(CatalogError::UploadsDisabled)?;
            update.image = Some(media.upload(image).await?);
        }

        if update.is_empty() {
            return Ok(existing);
        }

        let updated = match self.stickers.update(id, &update).await {
            Ok(Some(sticker)) => sticker,
            Ok(None) => {
                self.discard_new_image(&update).await;
                return Err(CatalogError::NotFound);
            }
            Err(e) => {
                self.discard_new_image(&update).await;
                return Err(e.into());
            }
        };

        if update.image.is_some() && existing.image_public_id != updated.image_public_id {
            media::destroy_quietly(self.media, &existing.image_public_id).await;
        }
        tracing::info!(sticker_id = %id, "sticker updated");
        Ok(updated)
    }

    /// Remove a sticker and its image.
    ///
    /// Orders keep their own copy of the title and price, so past orders
    /// still read correctly.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn delete(&self, id: StickerId) -> Result<Sticker, CatalogError> {
        let deleted = self.stickers.delete(id).await?.ok_or(CatalogError::NotFound)?;
        media::destroy_quietly(self.media, &deleted.image_public_id).await;
        tracing::info!(sticker_id = %id, "sticker deleted");
        Ok(deleted)
    }

    async fn discard_new_image(&self, update: &StickerUpdate) {
        if let Some(image) = &update.image {
            media::destroy_quietly(self.media, &image.public_id).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(title: &str, price: &str, category: &str) -> StickerFields {
        StickerFields {
            title: Some(title.to_owned()),
            price: Some(price.to_owned()),
            category: Some(category.to_owned()),
            ..StickerFields::default()
        }
    }

    #[test]
    fn test_valid_fields() {
        let mut form = fields("  Happy Cat ", "49.99", "cute");
        form.stock = Some("12".to_owned());
        let update = form.validated().unwrap();

        assert_eq!(update.title.as_deref(), Some("Happy Cat"));
        assert_eq!(update.price.unwrap().to_string(), "49.99");
        assert_eq!(update.stock, Some(12));
        assert_eq!(update.category, Some(StickerCategory::Cute));
    }

    #[test]
    fn test_blank_title_rejected() {
        let err = fields("   ", "10", "Funny").validated().unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
    }

    #[test]
    fn test_price_must_be_positive() {
        assert!(fields("A", "0", "Funny").validated().is_err());
        assert!(fields("A", "-3", "Funny").validated().is_err());
        assert!(fields("A", "abc", "Funny").validated().is_err());
    }

    #[test]
    fn test_price_above_column_limit_rejected() {
        let err = fields("A", "1000000000", "Funny").validated().unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
        assert_eq!(
            err.to_string(),
            "Invalid price: price must be at most 99999999.99"
        );
        assert!(fields("A", "99999999.99", "Funny").validated().is_ok());
    }

    #[test]
    fn test_stock_must_be_non_negative_integer() {
        let mut form = StickerFields::default();
        form.stock = Some("-1".to_owned());
        assert!(form.validated().is_err());
        form.stock = Some("2.5".to_owned());
        assert!(form.validated().is_err());
        form.stock = Some("0".to_owned());
        assert_eq!(form.validated().unwrap().stock, Some(0));
    }

    #[test]
    fn test_unknown_category_lists_choices() {
        let err = fields("A", "10", "Vehicles").validated().unwrap_err();
        assert!(err.to_string().contains("Trending"));
    }

    #[test]
    fn test_blank_description_kept_as_clear_request() {
        let form = StickerFields {
            description: Some("   ".to_owned()),
            ..StickerFields::default()
        };
        let update = form.validated().unwrap();
        assert_eq!(update.description.as_deref(), Some(""));
        assert!(!update.is_empty());
    }

    #[test]
    fn test_empty_form_is_empty_update() {
        assert!(StickerFields::default().validated().unwrap().is_empty());
    }
}
