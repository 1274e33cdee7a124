//! Catalog entity definitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier.
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Product name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Unit price. Never negative.
    pub price: Decimal,
    /// Catalog category.
    pub category: String,
    /// Units available for purchase. Never negative.
    pub stock: i32,
    /// Available sizes.
    pub sizes: Vec<String>,
    /// Available colors.
    pub colors: Vec<String>,
    /// Public image URLs, in display order.
    pub images: Vec<String>,
    /// Whether the product is highlighted on the storefront.
    pub featured: bool,
    /// Whether the product is visible in the public listing.
    pub is_active: bool,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a new active product with no variants or images.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Decimal,
        category: impl Into<String>,
        stock: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            price,
            category: category.into(),
            stock,
            sizes: Vec::new(),
            colors: Vec::new(),
            images: Vec::new(),
            featured: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the available sizes.
    pub fn with_sizes(mut self, sizes: Vec<String>) -> Self {
        self.sizes = sizes;
        self
    }

    /// Sets the available colors.
    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = colors;
        self
    }

    /// Sets the image URLs.
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Marks the product as featured.
    pub fn with_featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }

    /// Returns true if `quantity` units can be taken from stock.
    pub fn has_stock_for(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }

    /// Case-insensitive substring match against name and description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}
