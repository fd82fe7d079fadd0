//! Order route handlers.
//!
//! Customers place and list their own orders; admins list every order and
//! move orders through their lifecycle.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use sticker_shop_core::{
    OrderId, OrderLineRequest, OrderStatus, PaymentMethod, ShippingAddress, StickerId,
};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::Order;
use crate::routes::extract::{ApiJson, non_blank, parse_id};
use crate::services::orders::{Checkout, OrderService};
use crate::state::AppState;

/// One requested line. Older clients send the id as `sticker`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[serde(alias = "sticker")]
    pub sticker_id: Option<i32>,
    pub quantity: Option<i64>,
}

/// Body of `POST /api/orders`.
///
/// A client-side `total` may be present; it is ignored and the total is
/// computed from catalog prices.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(alias = "shippingAddress")]
    pub address: Option<ShippingAddress>,
    pub payment_method: Option<String>,
}

impl PlaceOrderRequest {
    fn into_checkout(self) -> Result<Checkout> {
        let lines = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let sticker_id = item.sticker_id.map(StickerId::new).ok_or_else(|| {
                    AppError::BadRequest(format!("Item {} is missing stickerId", index + 1))
                })?;
                Ok(OrderLineRequest::new(
                    index,
                    sticker_id,
                    item.quantity.unwrap_or(0),
                )?)
            })
            .collect::<Result<Vec<_>>>()?;

        let payment_method = match non_blank(self.payment_method.as_deref()) {
            None => PaymentMethod::default(),
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid payment method: {raw}")))?,
        };

        Ok(Checkout {
            lines,
            shipping_address: self.address.unwrap_or_default(),
            payment_method,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrderResponse {
    pub success: bool,
    pub message: &'static str,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

/// POST /api/orders
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrderResponse>)> {
    let checkout = req.into_checkout()?;
    let order = OrderService::new(state.pool())
        .place(user.id, &checkout)
        .await?;

    tracing::info!(order_id = %order.id, total = %order.total, "order placed");
    Ok((
        StatusCode::CREATED,
        Json(PlacedOrderResponse {
            success: true,
            message: "Order placed successfully",
            order,
        }),
    ))
}

/// GET /api/orders/me
pub async fn mine(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<OrderListResponse>> {
    let orders = OrderService::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(OrderListResponse {
        success: true,
        orders,
    }))
}

/// GET /api/orders
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<OrderListResponse>> {
    let orders = OrderService::new(state.pool()).list_all().await?;
    Ok(Json(OrderListResponse {
        success: true,
        orders,
    }))
}

/// PUT /api/orders/{id}/status
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, order_id = %id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<OrderResponse>> {
    let id: OrderId = parse_id(&id, "order")?;
    let status: OrderStatus = non_blank(req.status.as_deref())
        .ok_or_else(|| AppError::BadRequest("Status is required".to_string()))?
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid order status".to_string()))?;

    let order = OrderService::new(state.pool())
        .update_status(id, status)
        .await?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(json: &str) -> PlaceOrderRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accepts_both_field_spellings() {
        let checkout = request(
            r#"{
                "items": [{"sticker": 3, "quantity": 2}, {"stickerId": 4, "quantity": 1}],
                "shippingAddress": {"street": "1 Main", "city": "Pune", "state": "MH",
                                    "postalCode": "411001", "country": "IN"},
                "paymentMethod": "online",
                "total": 0.01
            }"#,
        )
        .into_checkout()
        .unwrap();

        assert_eq!(checkout.lines.len(), 2);
        assert_eq!(checkout.lines[0].sticker_id, StickerId::new(3));
        assert_eq!(checkout.lines[0].quantity, 2);
        assert_eq!(checkout.shipping_address.city, "Pune");
        assert_eq!(checkout.payment_method, PaymentMethod::Online);
    }

    #[test]
    fn test_payment_method_defaults_to_cod() {
        let checkout = request(r#"{"items": [{"stickerId": 1, "quantity": 1}]}"#)
            .into_checkout()
            .unwrap();
        assert_eq!(checkout.payment_method, PaymentMethod::Cod);
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(matches!(
            request(r#"{"items": [{"quantity": 1}]}"#).into_checkout(),
            Err(AppError::BadRequest(m)) if m == "Item 1 is missing stickerId"
        ));
        assert!(matches!(
            request(r#"{"items": [{"stickerId": 1, "quantity": 0}]}"#).into_checkout(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            request(r#"{"items": [{"stickerId": 1, "quantity": 1}], "paymentMethod": "card"}"#)
                .into_checkout(),
            Err(AppError::BadRequest(_))
        ));
    }
}
