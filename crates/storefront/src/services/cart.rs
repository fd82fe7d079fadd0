//! Cart operations.
//!
//! Every mutation loads the stored lines under a row lock, applies the core
//! [`CartLines`] operation and writes the list back. Reads resolve lines
//! against the live catalog.

use sqlx::PgPool;
use thiserror::Error;

use sticker_shop_core::{
    CartError, CartLines, MAX_LINE_QUANTITY, StickerId, UserId, checked_quantity,
};

use crate::db::{CartRepository, RepositoryError, StickerRepository};
use crate::models::CartView;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Sticker not found")]
    StickerNotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validate a quantity from the request body.
fn parse_quantity(raw: i64) -> Result<u32, CartError> {
    if raw < 1 {
        return Err(CartError::InvalidQuantity);
    }
    checked_quantity(raw).ok_or(CartError::QuantityTooLarge {
        max: MAX_LINE_QUANTITY,
    })
}

/// Cart service for one user's cart.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    stickers: StickerRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            stickers: StickerRepository::new(pool),
        }
    }

    /// The user's cart; an empty cart if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if a query fails.
    pub async fn get(&self, user_id: UserId) -> Result<CartView, CartServiceError> {
        match self.carts.get(user_id).await? {
            Some(lines) => self.view(&lines).await,
            None => Ok(CartView::default()),
        }
    }

    /// Add `quantity` of a sticker, merging with an existing line.
    ///
    /// The cart is created on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a quantity below one and
    /// `CartServiceError::StickerNotFound` for an unknown sticker.
    pub async fn add(
        &self,
        user_id: UserId,
        sticker_id: StickerId,
        quantity: i64,
    ) -> Result<CartView, CartServiceError> {
        let quantity = parse_quantity(quantity)?;
        if self.stickers.get(sticker_id).await?.is_none() {
            return Err(CartServiceError::StickerNotFound);
        }

        let (lines, merged) = self
            .carts
            .modify(user_id, true, |lines| {
                lines.add(sticker_id, quantity).map_err(CartServiceError::from)
            })
            .await?
            .ok_or(CartServiceError::CartNotFound)?;

        tracing::debug!(user_id = %user_id, sticker_id = %sticker_id, quantity = merged, "cart line added");
        self.view(&lines).await
    }

    /// Remove a sticker's line. Removing a sticker that is not in the cart
    /// leaves the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::CartNotFound` if the user has no cart.
    pub async fn remove(
        &self,
        user_id: UserId,
        sticker_id: StickerId,
    ) -> Result<CartView, CartServiceError> {
        let (lines, _) = self
            .carts
            .modify(user_id, false, |lines| {
                Ok::<_, CartServiceError>(lines.remove(sticker_id))
            })
            .await?
            .ok_or(CartServiceError::CartNotFound)?;

        self.view(&lines).await
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a quantity below one,
    /// `CartServiceError::CartNotFound` without a cart and
    /// `CartError::LineNotFound` if the sticker is not in the cart.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        sticker_id: StickerId,
        quantity: i64,
    ) -> Result<CartView, CartServiceError> {
        let quantity = parse_quantity(quantity)?;

        let (lines, ()) = self
            .carts
            .modify(user_id, false, |lines| {
                lines
                    .set_quantity(sticker_id, quantity)
                    .map_err(CartServiceError::from)
            })
            .await?
            .ok_or(CartServiceError::CartNotFound)?;

        self.view(&lines).await
    }

    async fn view(&self, lines: &CartLines) -> Result<CartView, CartServiceError> {
        let stickers = self.stickers.get_many(&lines.sticker_ids()).await?;
        Ok(CartView::resolve(lines, &stickers))
    }
}
