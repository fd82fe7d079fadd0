//! Seed the catalog with stickers from a YAML file.
//!
//! Images must already be uploaded; each entry names its delivery URL and
//! CDN public id.
//!
//! ```yaml
//! stickers:
//!   - title: Sleepy Cat
//!     description: A cat that would rather be napping
//!     price: "149.00"
//!     stock: 25
//!     category: Animals
//!     image_url: https://res.cloudinary.com/demo/image/upload/stickers/sleepy-cat.png
//!     public_id: stickers/sleepy-cat
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};

use sticker_shop_core::{Price, StickerCategory};
use sticker_shop_storefront::db::StickerRepository;
use sticker_shop_storefront::models::{ImageRef, NewSticker};

use super::connect;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub stickers: Vec<SeedSticker>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSticker {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    pub category: String,
    pub image_url: String,
    pub public_id: String,
}

impl SeedSticker {
    fn to_new_sticker(&self) -> Result<NewSticker, String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_owned());
        }
        let price = Price::new(self.price).map_err(|e| e.to_string())?;
        let category: StickerCategory = self.category.parse().map_err(|e| format!("{e}"))?;

        Ok(NewSticker {
            title: self.title.trim().to_owned(),
            description: self.description.clone(),
            price,
            stock: self.stock,
            category,
            image: ImageRef {
                url: self.image_url.clone(),
                public_id: self.public_id.clone(),
            },
            uploaded_by: None,
        })
    }
}

/// Validate every entry, collecting one message per invalid entry.
fn validate(file: &SeedFile) -> Vec<String> {
    file.stickers
        .iter()
        .enumerate()
        .filter_map(|(i, sticker)| {
            sticker
                .to_new_sticker()
                .err()
                .map(|e| format!("entry {} ({}): {e}", i + 1, sticker.title))
        })
        .collect()
}

/// Seed stickers from a YAML file. Titles already in the catalog are
/// skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a database operation fails.
pub async fn stickers(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading stickers from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = connect().await?;
    let repo = StickerRepository::new(&pool);

    let mut existing: HashSet<String> = repo
        .list(None)
        .await?
        .into_iter()
        .map(|s| s.title.to_lowercase())
        .collect();

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for entry in &file.stickers {
        let sticker = entry.to_new_sticker()?;
        if !existing.insert(sticker.title.to_lowercase()) {
            warn!(title = %sticker.title, "Sticker already exists, skipping");
            skipped += 1;
            continue;
        }
        repo.create(&sticker).await?;
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Stickers inserted: {inserted}");
    info!("  Stickers skipped (already exist): {skipped}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_validate_seed_file() {
        let file: SeedFile = serde_yaml::from_str(
            r#"
stickers:
  - title: Sleepy Cat
    price: "149.00"
    stock: 25
    category: animals
    image_url: https://cdn.example/cat.png
    public_id: stickers/cat
  - title: Free Lunch
    price: 0
    category: Food
    image_url: https://cdn.example/lunch.png
    public_id: stickers/lunch
  - title: Robot
    price: 10
    category: Robots
    image_url: https://cdn.example/robot.png
    public_id: stickers/robot
"#,
        )
        .unwrap();

        let sticker = file.stickers[0].to_new_sticker().unwrap();
        assert_eq!(sticker.category, StickerCategory::Animals);
        assert_eq!(sticker.stock, 25);

        let errors = validate(&file);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("entry 2 (Free Lunch)"));
        assert!(errors[1].starts_with("entry 3 (Robot)"));
    }
}
