//! Placed orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sticker_shop_core::{
    OrderId, OrderStatus, PaymentMethod, Price, ShippingAddress, StickerId, UserId,
};

use super::{UserSummary, money};

/// One frozen order line.
///
/// `title` and `unit_price` are the values at placement; `image_url` is
/// looked up from the live catalog and is `None` once the sticker is gone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub sticker_id: StickerId,
    pub title: String,
    #[serde(serialize_with = "money::price")]
    pub unit_price: Price,
    pub quantity: u32,
    #[serde(serialize_with = "money::amount")]
    pub line_total: Decimal,
    pub image_url: Option<String>,
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Filled in for admin listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    pub items: Vec<OrderItem>,
    #[serde(serialize_with = "money::amount")]
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_json_shape() {
        let order = Order {
            id: OrderId::new(10),
            user_id: UserId::new(2),
            user: None,
            items: vec![OrderItem {
                sticker_id: StickerId::new(5),
                title: "Taco".to_string(),
                unit_price: "100".parse().unwrap(),
                quantity: 2,
                line_total: Decimal::from(200),
                image_url: None,
            }],
            total: Decimal::from(200),
            shipping_address: ShippingAddress {
                street: "1 Main".to_string(),
                city: "Pune".to_string(),
                state: "MH".to_string(),
                postal_code: "411001".to_string(),
                country: "India".to_string(),
            },
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Cod,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["total"], 200.0);
        assert_eq!(json["status"], "pending");
        assert_eq!(json["paymentMethod"], "COD");
        assert_eq!(json["shippingAddress"]["postalCode"], "411001");
        assert_eq!(json["items"][0]["unitPrice"], 100.0);
        assert!(json.get("user").is_none());
    }
}
