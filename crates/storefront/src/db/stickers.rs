//! Sticker catalog repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use sticker_shop_core::{Price, StickerCategory, StickerId, UserId};

use super::{RepositoryError, from_count, to_count};
use crate::models::sticker::{NewSticker, Sticker, StickerUpdate};

/// Row type for `storefront.sticker` queries.
#[derive(Debug, sqlx::FromRow)]
struct StickerRow {
    id: i32,
    title: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    category: StickerCategory,
    image_url: String,
    image_public_id: String,
    uploaded_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StickerRow> for Sticker {
    type Error = RepositoryError;

    fn try_from(row: StickerRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for sticker {}: {e}", row.id))
        })?;

        Ok(Self {
            id: StickerId::new(row.id),
            title: row.title,
            description: row.description,
            price,
            stock: to_count(row.stock, "stock")?,
            category: row.category,
            image_url: row.image_url,
            image_public_id: row.image_public_id,
            uploaded_by: row.uploaded_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<StickerRow>) -> Result<Vec<Sticker>, RepositoryError> {
    rows.into_iter().map(Sticker::try_from).collect()
}

/// Repository for catalog operations.
pub struct StickerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StickerRepository<'a> {
    /// Create a new sticker repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List stickers, newest first, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        category: Option<StickerCategory>,
    ) -> Result<Vec<Sticker>, RepositoryError> {
        let rows = sqlx::query_as::<_, StickerRow>(
            r"
            SELECT id, title, description, price, stock, category, image_url,
                   image_public_id, uploaded_by, created_at, updated_at
            FROM storefront.sticker
            WHERE $1::storefront.sticker_category IS NULL OR category = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        collect(rows)
    }

    /// Get a sticker by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: StickerId) -> Result<Option<Sticker>, RepositoryError> {
        sqlx::query_as::<_, StickerRow>(
            r"
            SELECT id, title, description, price, stock, category, image_url,
                   image_public_id, uploaded_by, created_at, updated_at
            FROM storefront.sticker
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Sticker::try_from)
        .transpose()
    }

    /// Get every sticker in `ids` that still exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[StickerId]) -> Result<Vec<Sticker>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().copied().map(StickerId::as_i32).collect();

        let rows = sqlx::query_as::<_, StickerRow>(
            r"
            SELECT id, title, description, price, stock, category, image_url,
                   image_public_id, uploaded_by, created_at, updated_at
            FROM storefront.sticker
            WHERE id = ANY($1)
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        collect(rows)
    }

    /// Insert a sticker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, sticker: &NewSticker) -> Result<Sticker, RepositoryError> {
        let row = sqlx::query_as::<_, StickerRow>(
            r"
            INSERT INTO storefront.sticker
                (title, description, price, stock, category, image_url,
                 image_public_id, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, description, price, stock, category, image_url,
                      image_public_id, uploaded_by, created_at, updated_at
            ",
        )
        .bind(&sticker.title)
        .bind(sticker.description.as_deref())
        .bind(sticker.price)
        .bind(from_count(sticker.stock, "stock")?)
        .bind(sticker.category)
        .bind(&sticker.image.url)
        .bind(&sticker.image.public_id)
        .bind(sticker.uploaded_by)
        .fetch_one(self.pool)
        .await?;

        Sticker::try_from(row)
    }

    /// Apply a partial update.
    ///
    /// Returns `None` if the sticker does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: StickerId,
        update: &StickerUpdate,
    ) -> Result<Option<Sticker>, RepositoryError> {
        let stock = update
            .stock
            .map(|stock| from_count(stock, "stock"))
            .transpose()?;

        sqlx::query_as::<_, StickerRow>(
            r"
            UPDATE storefront.sticker
            SET title = COALESCE($2, title),
                description = CASE WHEN $3::text IS NULL THEN description ELSE NULLIF($3, '') END,
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                category = COALESCE($6, category),
                image_url = COALESCE($7, image_url),
                image_public_id = COALESCE($8, image_public_id),
                updated_at = now()
            WHERE id = $1
            RETURNING id, title, description, price, stock, category, image_url,
                      image_public_id, uploaded_by, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(stock)
        .bind(update.category)
        .bind(update.image.as_ref().map(|image| image.url.as_str()))
        .bind(update.image.as_ref().map(|image| image.public_id.as_str()))
        .fetch_optional(self.pool)
        .await?
        .map(Sticker::try_from)
        .transpose()
    }

    /// Delete a sticker, returning the deleted row.
    ///
    /// Carts keep their lines for the sticker; orders keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: StickerId) -> Result<Option<Sticker>, RepositoryError> {
        sqlx::query_as::<_, StickerRow>(
            r"
            DELETE FROM storefront.sticker
            WHERE id = $1
            RETURNING id, title, description, price, stock, category, image_url,
                      image_public_id, uploaded_by, created_at, updated_at
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Sticker::try_from)
        .transpose()
    }
}
