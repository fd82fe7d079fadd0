//! Catalog types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sticker_shop_core::{Price, StickerCategory, StickerId, UserId};

use super::money;

/// Where a sticker's image lives on the CDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Public delivery URL.
    pub url: String,
    /// Provider id used to delete the image.
    pub public_id: String,
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub id: StickerId,
    pub title: String,
    pub description: Option<String>,
    #[serde(serialize_with = "money::price")]
    pub price: Price,
    pub stock: u32,
    pub category: StickerCategory,
    pub image_url: String,
    #[serde(rename = "publicId")]
    pub image_public_id: String,
    pub uploaded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sticker {
    #[must_use]
    pub fn image(&self) -> ImageRef {
        ImageRef {
            url: self.image_url.clone(),
            public_id: self.image_public_id.clone(),
        }
    }
}

/// Display data for a sticker referenced from a cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerSummary {
    pub id: StickerId,
    pub title: String,
    #[serde(serialize_with = "money::price")]
    pub price: Price,
    pub stock: u32,
    pub image_url: String,
}

impl From<&Sticker> for StickerSummary {
    fn from(sticker: &Sticker) -> Self {
        Self {
            id: sticker.id,
            title: sticker.title.clone(),
            price: sticker.price,
            stock: sticker.stock,
            image_url: sticker.image_url.clone(),
        }
    }
}

/// Fields for inserting a sticker.
#[derive(Debug, Clone)]
pub struct NewSticker {
    pub title: String,
    pub description: Option<String>,
    pub price: Price,
    pub stock: u32,
    pub category: StickerCategory,
    pub image: ImageRef,
    pub uploaded_by: Option<UserId>,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct StickerUpdate {
    pub title: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<u32>,
    pub category: Option<StickerCategory>,
    pub image: Option<ImageRef>,
}

impl StickerUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.image.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sticker_json_shape() {
        let sticker = Sticker {
            id: StickerId::new(3),
            title: "Sleepy Cat".to_string(),
            description: None,
            price: "4.50".parse().unwrap(),
            stock: 12,
            category: StickerCategory::Cute,
            image_url: "https://cdn.test/cat.png".to_string(),
            image_public_id: "stickers/cat".to_string(),
            uploaded_by: Some(UserId::new(1)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&sticker).unwrap();
        assert_eq!(json["price"], 4.5);
        assert_eq!(json["category"], "Cute");
        assert_eq!(json["imageUrl"], "https://cdn.test/cat.png");
        assert_eq!(json["publicId"], "stickers/cat");
        assert_eq!(json["uploadedBy"], 1);
    }

    #[test]
    fn test_update_is_empty() {
        assert!(StickerUpdate::default().is_empty());
        let update = StickerUpdate {
            stock: Some(0),
            ..StickerUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
