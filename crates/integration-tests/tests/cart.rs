//! Cart behaviour against a real database.
//!
//! These tests require a `PostgreSQL` database named by `TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p sticker-shop-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use sticker_shop_core::{CartError, StickerId, UserRole};
use sticker_shop_integration_tests::{create_sticker, create_user, test_pool};
use sticker_shop_storefront::services::cart::{CartService, CartServiceError};

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_new_user_has_empty_cart() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::User).await;

    let cart = CartService::new(&pool).get(user.id).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_adding_same_sticker_merges_lines() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::User).await;
    let sticker = create_sticker(&pool, Decimal::new(4_950, 2), 10).await;
    let carts = CartService::new(&pool);

    carts.add(user.id, sticker.id, 2).await.unwrap();
    let cart = carts.add(user.id, sticker.id, 3).await.unwrap();

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].sticker_id, sticker.id);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.total, Decimal::new(24_750, 2));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_set_quantity_and_remove() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::User).await;
    let a = create_sticker(&pool, Decimal::from(10), 10).await;
    let b = create_sticker(&pool, Decimal::from(20), 10).await;
    let carts = CartService::new(&pool);

    carts.add(user.id, a.id, 1).await.unwrap();
    carts.add(user.id, b.id, 1).await.unwrap();

    let cart = carts.set_quantity(user.id, a.id, 4).await.unwrap();
    assert_eq!(cart.total, Decimal::from(60));

    let cart = carts.remove(user.id, b.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total, Decimal::from(40));

    // Removing a sticker that is not in the cart leaves it as it was.
    let cart = carts.remove(user.id, b.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_invalid_cart_operations() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::User).await;
    let sticker = create_sticker(&pool, Decimal::from(10), 10).await;
    let carts = CartService::new(&pool);

    // No cart yet.
    assert!(matches!(
        carts.remove(user.id, sticker.id).await,
        Err(CartServiceError::CartNotFound)
    ));

    assert!(matches!(
        carts.add(user.id, sticker.id, 0).await,
        Err(CartServiceError::Cart(CartError::InvalidQuantity))
    ));
    assert!(matches!(
        carts.add(user.id, StickerId::new(i32::MAX), 1).await,
        Err(CartServiceError::StickerNotFound)
    ));

    carts.add(user.id, sticker.id, 1).await.unwrap();
    let other = create_sticker(&pool, Decimal::from(5), 1).await;
    assert!(matches!(
        carts.set_quantity(user.id, other.id, 2).await,
        Err(CartServiceError::Cart(CartError::LineNotFound(id))) if id == other.id
    ));
}
