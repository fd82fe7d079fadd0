//! Cart repository.
//!
//! Each user has at most one row in `storefront.cart`; its `items` column holds
//! the serialized [`CartLines`]. Every change runs as read-modify-write inside
//! a transaction that holds the row lock.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use sticker_shop_core::{CartLines, StickerId, UserId};

use super::RepositoryError;

/// Repository for cart operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the cart lines for a user; `None` if the user has no cart yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Option<CartLines>, RepositoryError> {
        let items: Option<Json<CartLines>> =
            sqlx::query_scalar("SELECT items FROM storefront.cart WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        Ok(items.map(|Json(lines)| lines))
    }

    /// Run `apply` against the user's cart and store the result.
    ///
    /// With `create` set a missing cart starts out empty; otherwise a missing
    /// cart returns `Ok(None)` without calling `apply`. If `apply` fails
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply`, or a `RepositoryError` converted into
    /// `E` if the database fails.
    pub async fn modify<T, E>(
        &self,
        user_id: UserId,
        create: bool,
        apply: impl FnOnce(&mut CartLines) -> Result<T, E> + Send,
    ) -> Result<Option<(CartLines, T)>, E>
    where
        E: From<RepositoryError>,
    {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let existing = lock_lines(&mut tx, user_id).await?;
        let Some(mut lines) = existing.or_else(|| create.then(CartLines::new)) else {
            return Ok(None);
        };

        let outcome = apply(&mut lines)?;
        store_lines(&mut tx, user_id, &lines).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(Some((lines, outcome)))
    }
}

/// Read the cart lines with the row locked until the transaction ends.
async fn lock_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<CartLines>, RepositoryError> {
    let items: Option<Json<CartLines>> =
        sqlx::query_scalar("SELECT items FROM storefront.cart WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(items.map(|Json(lines)| lines))
}

async fn store_lines(
    conn: &mut PgConnection,
    user_id: UserId,
    lines: &CartLines,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.cart (user_id, items)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET items = EXCLUDED.items, updated_at = now()
        ",
    )
    .bind(user_id)
    .bind(Json(lines))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Drop lines for `sticker_ids` from the user's cart, if they have one.
///
/// Used by order placement inside its own transaction.
pub(super) async fn remove_lines(
    conn: &mut PgConnection,
    user_id: UserId,
    sticker_ids: &[StickerId],
) -> Result<(), RepositoryError> {
    if let Some(mut lines) = lock_lines(conn, user_id).await? {
        let before = lines.len();
        lines.remove_all(sticker_ids);
        if lines.len() != before {
            store_lines(conn, user_id, &lines).await?;
        }
    }
    Ok(())
}
