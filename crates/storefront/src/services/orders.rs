//! Order placement and lifecycle.

use sqlx::PgPool;

use sticker_shop_core::{
    OrderId, OrderLineRequest, OrderStatus, PaymentMethod, ShippingAddress, UserId,
    validate_request,
};

use crate::db::orders::NewOrder;
use crate::db::{OrderRepository, PlacementError, RepositoryError, StatusChangeError};
use crate::models::Order;

/// A checkout request that has passed shape validation.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub lines: Vec<OrderLineRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Order service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Place an order for `user_id`.
    ///
    /// The request is checked for shape first; prices and stock are then read
    /// from the catalog inside the placement transaction. Any client-side total
    /// plays no part.
    ///
    /// # Errors
    ///
    /// Returns `PlacementError::Rejected` for an empty order, a bad address, an
    /// unknown sticker or insufficient stock.
    pub async fn place(&self, user_id: UserId, checkout: &Checkout) -> Result<Order, PlacementError> {
        validate_request(&checkout.lines, &checkout.shipping_address)?;
        let shipping_address = checkout.shipping_address.trimmed();

        self.orders
            .place(&NewOrder {
                user_id,
                lines: &checkout.lines,
                shipping_address: &shipping_address,
                payment_method: checkout.payment_method,
            })
            .await
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.orders.list_for_user(user_id).await
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.orders.list_all().await
    }

    /// Move an order through its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::NotFound` or
    /// `StatusChangeError::InvalidTransition`.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        let order = self.orders.update_status(id, status).await?;
        tracing::info!(order_id = %id, status = %order.status, "order status updated");
        Ok(order)
    }
}
