//! Order repository.
//!
//! Placement and status changes each run in one transaction. Sticker rows are
//! locked in ascending id order before their stock is read, so concurrent
//! orders for the same sticker queue behind each other and the stock check
//! always sees committed counts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use sticker_shop_core::{
    OrderError, OrderId, OrderLineRequest, OrderPlanner, OrderStatus, PaymentMethod, Price,
    ShippingAddress, StickerId, StockSnapshot, UserId,
};

use super::{RepositoryError, carts, from_count, to_count};
use crate::models::{Order, OrderItem, UserSummary};

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The request failed validation against the catalog.
    #[error(transparent)]
    Rejected(#[from] OrderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlacementError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Errors from changing an order's status.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error("Order not found")]
    NotFound,

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// A validated order ready to be checked against stock.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub lines: &'a [OrderLineRequest],
    pub shipping_address: &'a ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, sqlx::FromRow)]
struct LockedStickerRow {
    id: i32,
    title: String,
    price: Decimal,
    stock: i32,
    image_url: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    total: Decimal,
    shipping_address: Json<ShippingAddress>,
    status: OrderStatus,
    payment_method: PaymentMethod,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: String,
    user_email: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    sticker_id: i32,
    title: String,
    unit_price: Decimal,
    quantity: i32,
    image_url: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let unit_price = Price::new(row.unit_price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price on order {}: {e}", row.order_id))
        })?;
        let quantity = to_count(row.quantity, "quantity")?;

        Ok(Self {
            sticker_id: StickerId::new(row.sticker_id),
            title: row.title,
            unit_price,
            quantity,
            line_total: unit_price.times(quantity),
            image_url: row.image_url,
        })
    }
}

/// Which orders to load.
#[derive(Debug, Clone, Copy, Default)]
struct OrderFilter {
    user_id: Option<UserId>,
    order_id: Option<OrderId>,
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// Locks the requested stickers, plans the order against their current
    /// price and stock, then writes the order, decrements stock and drops the
    /// ordered stickers from the user's cart. Either all of that commits or
    /// none of it does.
    ///
    /// # Errors
    ///
    /// Returns `PlacementError::Rejected` if a sticker is unknown or out of
    /// stock. Returns `PlacementError::Repository` if the database fails.
    pub async fn place(&self, order: &NewOrder<'_>) -> Result<Order, PlacementError> {
        let mut tx = self.pool.begin().await?;

        let mut ids: Vec<i32> = order
            .lines
            .iter()
            .map(|line| line.sticker_id.as_i32())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let rows = sqlx::query_as::<_, LockedStickerRow>(
            r"
            SELECT id, title, price, stock, image_url
            FROM storefront.sticker
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut images: HashMap<StickerId, String> = HashMap::with_capacity(rows.len());
        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            let sticker_id = StickerId::new(row.id);
            let price = Price::new(row.price).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid price for sticker {}: {e}", row.id))
            })?;
            snapshots.push(StockSnapshot {
                sticker_id,
                title: row.title,
                price,
                stock: to_count(row.stock, "stock")?,
            });
            images.insert(sticker_id, row.image_url);
        }

        let plan = OrderPlanner::new(&snapshots).plan(order.lines)?;

        let (order_id, created_at, updated_at): (i32, DateTime<Utc>, DateTime<Utc>) =
            sqlx::query_as(
                r"
                INSERT INTO storefront.customer_order
                    (user_id, total, shipping_address, status, payment_method)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, created_at, updated_at
                ",
            )
            .bind(order.user_id)
            .bind(plan.total)
            .bind(Json(order.shipping_address))
            .bind(OrderStatus::Pending)
            .bind(order.payment_method)
            .fetch_one(&mut *tx)
            .await?;

        for (position, line) in plan.lines.iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| {
                RepositoryError::DataCorruption(format!("order line position {position}"))
            })?;
            sqlx::query(
                r"
                INSERT INTO storefront.order_item
                    (order_id, position, sticker_id, title, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id)
            .bind(position)
            .bind(line.sticker_id)
            .bind(&line.title)
            .bind(line.unit_price)
            .bind(from_count(line.quantity, "quantity")?)
            .execute(&mut *tx)
            .await?;
        }

        for (sticker_id, quantity) in &plan.reservations {
            sqlx::query(
                r"
                UPDATE storefront.sticker
                SET stock = stock - $2, updated_at = now()
                WHERE id = $1
                ",
            )
            .bind(sticker_id)
            .bind(from_count(*quantity, "quantity")?)
            .execute(&mut *tx)
            .await?;
        }

        let ordered: Vec<StickerId> = plan.reservations.iter().map(|(id, _)| *id).collect();
        carts::remove_lines(&mut tx, order.user_id, &ordered).await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            user_id = %order.user_id,
            total = %plan.total,
            lines = plan.lines.len(),
            "Order placed"
        );

        let items = plan
            .lines
            .into_iter()
            .map(|line| OrderItem {
                image_url: images.get(&line.sticker_id).cloned(),
                line_total: line.line_total(),
                sticker_id: line.sticker_id,
                title: line.title,
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        Ok(Order {
            id: OrderId::new(order_id),
            user_id: order.user_id,
            user: None,
            items,
            total: plan.total,
            shipping_address: order.shipping_address.clone(),
            status: OrderStatus::Pending,
            payment_method: order.payment_method,
            created_at,
            updated_at,
        })
    }

    /// Orders placed by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self
            .load(OrderFilter {
                user_id: Some(user_id),
                ..OrderFilter::default()
            })
            .await?;
        for order in &mut orders {
            order.user = None;
        }
        Ok(orders)
    }

    /// Every order, newest first, with the ordering user attached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.load(OrderFilter::default()).await
    }

    /// Get one order with the ordering user attached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self
            .load(OrderFilter {
                order_id: Some(id),
                ..OrderFilter::default()
            })
            .await?;
        Ok(orders.into_iter().next())
    }

    /// Move an order to `next`.
    ///
    /// Setting the current status again is a no-op. Cancelling returns the
    /// ordered quantities to stock for stickers that still exist.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::NotFound` for an unknown order and
    /// `StatusChangeError::InvalidTransition` when the lifecycle forbids the
    /// move.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus = sqlx::query_scalar(
            "SELECT status FROM storefront.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StatusChangeError::NotFound)?;

        if current != next {
            if !current.can_transition_to(next) {
                return Err(StatusChangeError::InvalidTransition {
                    from: current,
                    to: next,
                });
            }

            if next == OrderStatus::Cancelled {
                restock(&mut tx, id).await?;
            }

            sqlx::query(
                r"
                UPDATE storefront.customer_order
                SET status = $2, updated_at = now()
                WHERE id = $1
                ",
            )
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

            tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");
        }

        tx.commit().await?;

        self.get(id).await?.ok_or(StatusChangeError::NotFound)
    }

    async fn load(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.user_id, o.total, o.shipping_address, o.status,
                   o.payment_method, o.created_at, o.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM storefront.customer_order o
            JOIN storefront.user u ON u.id = o.user_id
            WHERE ($1::int4 IS NULL OR o.user_id = $1)
              AND ($2::int4 IS NULL OR o.id = $2)
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(filter.user_id)
        .bind(filter.order_id)
        .fetch_all(self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.order_id, oi.sticker_id, oi.title, oi.unit_price, oi.quantity,
                   s.image_url
            FROM storefront.order_item oi
            LEFT JOIN storefront.sticker s ON s.id = oi.sticker_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.position
            ",
        )
        .bind(&order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut items: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items
                .entry(order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| Order {
                id: OrderId::new(row.id),
                user_id: UserId::new(row.user_id),
                user: Some(UserSummary {
                    id: UserId::new(row.user_id),
                    name: row.user_name,
                    email: row.user_email,
                }),
                items: items.remove(&row.id).unwrap_or_default(),
                total: row.total,
                shipping_address: row.shipping_address.0,
                status: row.status,
                payment_method: row.payment_method,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

/// Return an order's quantities to the stickers that still exist.
async fn restock(conn: &mut PgConnection, order_id: OrderId) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        SELECT s.id
        FROM storefront.sticker s
        WHERE s.id IN (SELECT sticker_id FROM storefront.order_item WHERE order_id = $1)
        ORDER BY s.id
        FOR UPDATE
        ",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
        UPDATE storefront.sticker s
        SET stock = s.stock + r.quantity, updated_at = now()
        FROM (
            SELECT sticker_id, SUM(quantity)::int4 AS quantity
            FROM storefront.order_item
            WHERE order_id = $1
            GROUP BY sticker_id
        ) r
        WHERE s.id = r.sticker_id
        ",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
