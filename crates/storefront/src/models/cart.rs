//! Cart as shown to the customer.

use rust_decimal::Decimal;
use serde::Serialize;

use sticker_shop_core::{CartLines, StickerId};

use super::{Sticker, StickerSummary, money};

/// One resolved cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub sticker_id: StickerId,
    /// `None` when the sticker has been removed from the catalog.
    pub sticker: Option<StickerSummary>,
    pub quantity: u32,
    #[serde(serialize_with = "money::amount")]
    pub line_total: Decimal,
}

/// A cart with lines resolved against the current catalog.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    #[serde(serialize_with = "money::amount")]
    pub total: Decimal,
}

impl CartView {
    /// Resolve `lines` against the stickers that still exist.
    #[must_use]
    pub fn resolve(lines: &CartLines, stickers: &[Sticker]) -> Self {
        let find = |id: StickerId| stickers.iter().find(|sticker| sticker.id == id);

        let items = lines
            .lines()
            .iter()
            .map(|line| {
                let sticker = find(line.sticker_id);
                CartItemView {
                    sticker_id: line.sticker_id,
                    sticker: sticker.map(StickerSummary::from),
                    quantity: line.quantity,
                    line_total: sticker.map_or(Decimal::ZERO, |s| s.price.times(line.quantity)),
                }
            })
            .collect();

        Self {
            items,
            total: lines.total(|id| find(id).map(|sticker| sticker.price)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use sticker_shop_core::StickerCategory;

    use super::*;

    fn sticker(id: i32, price: &str) -> Sticker {
        Sticker {
            id: StickerId::new(id),
            title: format!("Sticker {id}"),
            description: None,
            price: price.parse().unwrap(),
            stock: 5,
            category: StickerCategory::Funny,
            image_url: format!("https://cdn.test/{id}.png"),
            image_public_id: format!("stickers/{id}"),
            uploaded_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_cart_view() {
        let json = serde_json::to_value(CartView::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "items": [], "total": 0.0 }));
    }

    #[test]
    fn test_resolve_prices_lines() {
        let mut lines = CartLines::new();
        lines.add(StickerId::new(1), 2).unwrap();
        lines.add(StickerId::new(2), 1).unwrap();

        let view = CartView::resolve(&lines, &[sticker(1, "3.25"), sticker(2, "1")]);
        assert_eq!(view.total, Decimal::new(75, 1));
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].line_total, Decimal::new(650, 2));
    }

    #[test]
    fn test_resolve_skips_deleted_stickers_in_total() {
        let mut lines = CartLines::new();
        lines.add(StickerId::new(1), 2).unwrap();
        lines.add(StickerId::new(9), 4).unwrap();

        let view = CartView::resolve(&lines, &[sticker(1, "10")]);
        assert_eq!(view.total, Decimal::from(20));
        assert!(view.items[1].sticker.is_none());
        assert_eq!(view.items[1].line_total, Decimal::ZERO);
    }
}
