//! Catalog records as stored in the products, categories and deleted
//! products tables.
//!
//! Field names follow the Rust side; `serde` renames map them onto the
//! table's column names (`photo_url`, `disc_price`, `cat_sort`, `prcount`).

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category_code::CategoryCode;
use super::id::{CategoryId, ProductId};
use super::price::Pricing;

/// A catalog product.
///
/// The same shape is stored in the live table and, once soft-deleted, in the
/// deleted products table. Which table holds the row is the product's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Durable image URL (unset until an image is uploaded).
    #[serde(rename = "photo_url", default)]
    pub image_url: Option<String>,
    /// List price (2 × discounted price).
    pub price: Decimal,
    /// Operator-set price.
    #[serde(rename = "disc_price")]
    pub discounted_price: Decimal,
    /// Code of the category this product belongs to.
    pub category: CategoryCode,
    /// Position within the category.
    #[serde(rename = "cat_sort")]
    pub sort_position: i32,
}

impl Product {
    /// Both prices of this product.
    #[must_use]
    pub const fn pricing(&self) -> Pricing {
        Pricing {
            price: self.price,
            discounted_price: self.discounted_price,
        }
    }
}

/// A product that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    /// Display name.
    pub name: String,
    /// Durable image URL returned by the media store.
    #[serde(rename = "photo_url")]
    pub image_url: String,
    /// List price.
    pub price: Decimal,
    /// Operator-set price.
    #[serde(rename = "disc_price")]
    pub discounted_price: Decimal,
    /// Category code.
    pub category: CategoryCode,
    /// Position within the category.
    #[serde(rename = "cat_sort")]
    pub sort_position: i32,
}

impl NewProduct {
    /// Build a new product from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        image_url: impl Into<String>,
        pricing: Pricing,
        category: CategoryCode,
        sort_position: i32,
    ) -> Self {
        Self {
            name: name.into(),
            image_url: image_url.into(),
            price: pricing.price,
            discounted_price: pricing.discounted_price,
            category,
            sort_position,
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Store-assigned identifier.
    pub id: CategoryId,
    /// Operator-chosen code referenced by products.
    #[serde(rename = "category")]
    pub code: CategoryCode,
    /// Display name.
    pub name: String,
    /// Listing rank. Unset ranks list last.
    #[serde(default)]
    pub order: Option<i32>,
    /// Denormalized count of live products, maintained by hand.
    #[serde(rename = "prcount", default)]
    pub product_count: i32,
}

impl Category {
    /// Listing order: by rank, unranked last, ties broken by id.
    #[must_use]
    pub fn listing_cmp(&self, other: &Self) -> Ordering {
        match (self.order, other.order) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.id.cmp(&other.id))
    }
}

/// A category that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCategory {
    /// Operator-chosen code.
    #[serde(rename = "category")]
    pub code: CategoryCode,
    /// Display name.
    pub name: String,
    /// Listing rank.
    pub order: i32,
    /// Initial product counter.
    #[serde(rename = "prcount")]
    pub product_count: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn category(id: i64, order: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id),
            code: CategoryCode::parse(&id.to_string()).unwrap(),
            name: format!("Category {id}"),
            order,
            product_count: 0,
        }
    }

    #[test]
    fn test_product_decodes_from_table_columns() {
        let product: Product = serde_json::from_value(json!({
            "id": 10,
            "name": "Mango",
            "photo_url": "https://img.example/mango.jpg",
            "price": 20,
            "disc_price": 10,
            "category": "4",
            "cat_sort": 1,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(product.id, ProductId::new(10));
        assert_eq!(product.category.as_str(), "4");
        assert_eq!(product.sort_position, 1);
        assert_eq!(product.price, Decimal::from(20));
        assert_eq!(product.pricing().discounted_price, Decimal::from(10));
    }

    #[test]
    fn test_product_without_image() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "name": "Plain",
            "photo_url": null,
            "price": "3",
            "disc_price": "1.5",
            "category": "A",
            "cat_sort": 2
        }))
        .unwrap();

        assert!(product.image_url.is_none());
    }

    #[test]
    fn test_new_product_uses_column_names() {
        let pricing = Pricing::parse_discounted("5").unwrap();
        let new = NewProduct::new(
            "Kiwi",
            "https://img.example/kiwi.jpg",
            pricing,
            CategoryCode::parse("3").unwrap(),
            4,
        );

        let value = serde_json::to_value(&new).unwrap();
        assert_eq!(value["photo_url"], "https://img.example/kiwi.jpg");
        assert_eq!(value["disc_price"], "5");
        assert_eq!(value["price"], "10");
        assert_eq!(value["cat_sort"], 4);
        assert_eq!(value["category"], "3");
    }

    #[test]
    fn test_category_decodes_missing_order() {
        let category: Category = serde_json::from_value(json!({
            "id": 2,
            "category": "B",
            "name": "Bakery",
            "order": null,
            "prcount": 7
        }))
        .unwrap();

        assert_eq!(category.order, None);
        assert_eq!(category.product_count, 7);
    }

    #[test]
    fn test_listing_order_puts_unranked_last() {
        let mut categories = vec![
            category(3, None),
            category(1, Some(2)),
            category(2, Some(1)),
            category(4, Some(1)),
        ];
        categories.sort_by(Category::listing_cmp);

        let ids: Vec<i64> = categories.iter().map(|c| c.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }
}
