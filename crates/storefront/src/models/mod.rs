//! Domain models for the storefront.
//!
//! Repository row types convert into these; handlers serialize them as the
//! camelCase JSON the shop frontend reads.

pub mod cart;
pub mod order;
pub mod sticker;
pub mod user;

pub use cart::{CartItemView, CartView};
pub use order::{Order, OrderItem};
pub use sticker::{ImageRef, NewSticker, Sticker, StickerSummary, StickerUpdate};
pub use user::{PendingOtp, User, UserProfile, UserSummary};

/// Serialize money as a JSON number.
pub(crate) mod money {
    use rust_decimal::Decimal;
    use serde::Serializer;
    use sticker_shop_core::Price;

    pub fn price<S: Serializer>(price: &Price, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&price.amount(), serializer)
    }

    pub fn amount<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(amount, serializer)
    }
}
