//! Cart route handlers.
//!
//! Every endpoint operates on the signed-in user's cart and answers with the
//! whole cart resolved against the catalog.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use sticker_shop_core::StickerId;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::CartView;
use crate::routes::extract::ApiJson;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Body of the cart mutation endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CartLineRequest {
    pub sticker_id: Option<i32>,
    pub quantity: Option<i64>,
}

impl CartLineRequest {
    fn sticker_id(&self) -> Result<StickerId> {
        self.sticker_id
            .map(StickerId::new)
            .ok_or_else(|| AppError::BadRequest("stickerId is required".to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    pub cart: CartView,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        Self {
            success: true,
            cart,
        }
    }
}

/// GET /api/cart
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.pool()).get(user.id).await?;
    Ok(Json(cart.into()))
}

/// POST /api/cart/add
///
/// Quantity defaults to one.
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(req): ApiJson<CartLineRequest>,
) -> Result<Json<CartResponse>> {
    let sticker_id = req.sticker_id()?;
    let cart = CartService::new(state.pool())
        .add(user.id, sticker_id, req.quantity.unwrap_or(1))
        .await?;
    Ok(Json(cart.into()))
}

/// POST /api/cart/remove
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(req): ApiJson<CartLineRequest>,
) -> Result<Json<CartResponse>> {
    let sticker_id = req.sticker_id()?;
    let cart = CartService::new(state.pool())
        .remove(user.id, sticker_id)
        .await?;
    Ok(Json(cart.into()))
}

/// POST /api/cart/update
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(req): ApiJson<CartLineRequest>,
) -> Result<Json<CartResponse>> {
    let sticker_id = req.sticker_id()?;
    let quantity = req
        .quantity
        .ok_or_else(|| AppError::BadRequest("quantity is required".to_string()))?;
    let cart = CartService::new(state.pool())
        .set_quantity(user.id, sticker_id, quantity)
        .await?;
    Ok(Json(cart.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_request_reads_camel_case() {
        let req: CartLineRequest =
            serde_json::from_str(r#"{"stickerId": 7, "quantity": 3}"#).unwrap();
        assert_eq!(req.sticker_id().unwrap(), StickerId::new(7));
        assert_eq!(req.quantity, Some(3));
    }

    #[test]
    fn test_missing_sticker_id_is_bad_request() {
        let req: CartLineRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(req.sticker_id(), Err(AppError::BadRequest(_))));
    }
}
