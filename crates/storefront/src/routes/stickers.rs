//! Sticker catalog route handlers.
//!
//! Reads are public. Writes require an admin and take `multipart/form-data`
//! so that an image can travel with the fields.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use sticker_shop_core::{StickerCategory, StickerId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Sticker;
use crate::routes::extract::{non_blank, parse_id};
use crate::services::catalog::{CatalogService, StickerFields};
use crate::services::media::ImageUpload;
use crate::state::AppState;

/// Form field names accepted for the image file.
const IMAGE_FIELDS: [&str; 2] = ["image", "stickerImage"];

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StickerListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Sticker>,
}

#[derive(Debug, Serialize)]
pub struct StickerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: Sticker,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

/// `?category=` filter. Blank and `all` mean no filter.
fn category_filter(raw: Option<&str>) -> Result<Option<StickerCategory>> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Unknown category: {value}"))),
    }
}

/// A parsed sticker form.
struct StickerForm {
    fields: StickerFields,
    image: Option<ImageUpload>,
}

async fn read_text(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {}", e.body_text())))
}

async fn read_form(mut multipart: Multipart) -> Result<StickerForm> {
    let mut fields = StickerFields::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e.body_text())))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if IMAGE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or("upload").to_owned();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid image: {}", e.body_text())))?;
            // A file input left empty still sends a zero-length part.
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        match name.as_str() {
            "title" => fields.title = Some(read_text(field).await?),
            "description" => fields.description = Some(read_text(field).await?),
            "price" => fields.price = Some(read_text(field).await?),
            "stock" => fields.stock = Some(read_text(field).await?),
            "category" => fields.category = Some(read_text(field).await?),
            other => tracing::debug!(field = other, "ignoring unknown sticker form field"),
        }
    }

    Ok(StickerForm { fields, image })
}

/// GET /api/stickers
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<StickerListResponse>> {
    let category = category_filter(query.category.as_deref())?;
    let stickers = CatalogService::new(state.pool(), state.media())
        .list(category)
        .await?;

    Ok(Json(StickerListResponse {
        success: true,
        count: stickers.len(),
        data: stickers,
    }))
}

/// GET /api/stickers/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StickerResponse>> {
    let id: StickerId = parse_id(&id, "sticker")?;
    let sticker = CatalogService::new(state.pool(), state.media()).get(id).await?;

    Ok(Json(StickerResponse {
        success: true,
        message: None,
        data: sticker,
    }))
}

/// POST /api/stickers and POST /api/stickers/create
#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StickerResponse>)> {
    let form = read_form(multipart).await?;
    let sticker = CatalogService::new(state.pool(), state.media())
        .create(&form.fields, form.image, admin.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StickerResponse {
            success: true,
            message: Some("Sticker added"),
            data: sticker,
        }),
    ))
}

/// PUT /api/stickers/{id}
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, sticker_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<StickerResponse>> {
    let id: StickerId = parse_id(&id, "sticker")?;
    let form = read_form(multipart).await?;
    let sticker = CatalogService::new(state.pool(), state.media())
        .update(id, &form.fields, form.image)
        .await?;

    Ok(Json(StickerResponse {
        success: true,
        message: Some("Sticker updated"),
        data: sticker,
    }))
}

/// DELETE /api/stickers/{id}
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, sticker_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id: StickerId = parse_id(&id, "sticker")?;
    CatalogService::new(state.pool(), state.media())
        .delete(id)
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Sticker deleted successfully",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter() {
        assert_eq!(category_filter(None).unwrap(), None);
        assert_eq!(category_filter(Some("  ")).unwrap(), None);
        assert_eq!(category_filter(Some("All")).unwrap(), None);
        assert_eq!(
            category_filter(Some("animals")).unwrap(),
            Some(StickerCategory::Animals)
        );
        assert!(matches!(
            category_filter(Some("robots")),
            Err(AppError::BadRequest(_))
        ));
    }
}
