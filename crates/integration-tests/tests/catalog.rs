//! Catalog edits against a real database.
//!
//! These tests require a `PostgreSQL` database named by `TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p sticker-shop-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use sticker_shop_integration_tests::{create_sticker, test_pool};
use sticker_shop_storefront::db::StickerRepository;
use sticker_shop_storefront::models::StickerUpdate;

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_update_description_keep_set_and_clear() {
    let pool = test_pool().await;
    let sticker = create_sticker(&pool, Decimal::from(5), 3).await;
    let repo = StickerRepository::new(&pool);

    let kept = repo
        .update(
            sticker.id,
            &StickerUpdate {
                stock: Some(4),
                ..StickerUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.description.as_deref(), Some("Made by a test"));

    let set = repo
        .update(
            sticker.id,
            &StickerUpdate {
                description: Some("Glossy".to_owned()),
                ..StickerUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(set.description.as_deref(), Some("Glossy"));

    let cleared = repo
        .update(
            sticker.id,
            &StickerUpdate {
                description: Some(String::new()),
                ..StickerUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.description, None);
}
