//! Category and product documents, plus display helpers.

use serde::{Deserialize, Serialize};

use crate::record::{invalid, lenient_amount};
use crate::{CatalogError, Record};

/// Shown in place of a missing or broken product or category image.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/60x60?text=No+Image";

/// Shown in place of a missing order line item image.
pub const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/40x40?text=No+Image";

/// Returns `url`, or `fallback` when `url` is blank.
pub fn image_or<'a>(url: &'a str, fallback: &'a str) -> &'a str {
    if url.trim().is_empty() { fallback } else { url }
}

/// Formats an amount the way the console shows prices: `₹12.50`.
pub fn format_amount(amount: f64) -> String {
    format!("₹{amount:.2}")
}

/// A product category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub title: String,
    #[serde(default)]
    pub image_url: String,
}

impl Category {
    pub fn new(title: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image_url: image_url.into(),
        }
    }

    pub fn image(&self) -> &str {
        image_or(&self.image_url, PLACEHOLDER_IMAGE)
    }
}

impl Record for Category {
    const COLLECTION: &'static str = "categories";
    const KIND: &'static str = "category";

    fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(invalid::<Self>("title is required"));
        }
        Ok(())
    }
}

/// A product listed in the storefront.
///
/// `category` holds the category's title, not its id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category: String,
}

impl Product {
    pub fn image(&self) -> &str {
        image_or(&self.image_url, PLACEHOLDER_IMAGE)
    }

    /// The description cut to 50 characters, with `...` when cut.
    pub fn summary(&self) -> String {
        const LIMIT: usize = 50;
        match self.description.char_indices().nth(LIMIT) {
            Some((cut, _)) => format!("{}...", &self.description[..cut]),
            None => self.description.clone(),
        }
    }

    /// The category title, or `N/A` when unset.
    pub fn category_label(&self) -> &str {
        if self.category.is_empty() { "N/A" } else { &self.category }
    }
}

impl Record for Product {
    const COLLECTION: &'static str = "products";
    const KIND: &'static str = "product";

    fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(invalid::<Self>("title is required"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(invalid::<Self>("price must be a non-negative number"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_category_uses_camel_case_fields() {
        let doc = serde_json::to_value(Category::new("Shoes", "https://img/s.png")).unwrap();

        assert_eq!(doc, json!({ "title": "Shoes", "imageUrl": "https://img/s.png" }));
    }

    #[test]
    fn test_product_reads_string_price() {
        let product: Product = serde_json::from_value(json!({
            "title": "Boot",
            "description": "Leather",
            "price": "49.99",
            "imageUrl": "",
            "category": "Shoes"
        }))
        .unwrap();

        assert_eq!(product.price, 49.99);
        assert_eq!(product.image(), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_validate_requires_title() {
        let err = Category::new("  ", "").validate().unwrap_err();

        assert!(matches!(err, CatalogError::Invalid { kind: "category", .. }));
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let product = Product {
            title: "Boot".into(),
            price: -1.0,
            ..Product::default()
        };

        assert!(product.validate().is_err());
    }

    #[test]
    fn test_summary_truncates_long_descriptions() {
        let product = Product {
            description: "x".repeat(60),
            ..Product::default()
        };

        assert_eq!(product.summary(), format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_summary_keeps_short_descriptions() {
        let product = Product {
            description: "short".into(),
            ..Product::default()
        };

        assert_eq!(product.summary(), "short");
    }

    #[test]
    fn test_category_label_defaults_to_na() {
        assert_eq!(Product::default().category_label(), "N/A");
    }

    #[test]
    fn test_format_amount_two_decimals() {
        assert_eq!(format_amount(12.5), "₹12.50");
        assert_eq!(format_amount(0.0), "₹0.00");
    }

    #[test]
    fn test_record_paths() {
        assert_eq!(Category::path("c1"), "categories/c1");
        assert_eq!(Product::path("p1"), "products/p1");
    }
}
