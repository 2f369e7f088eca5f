//! Operator-facing reply texts.

use std::fmt::Write as _;

use shelf_core::{Category, CategoryId, Product, ProductId};

use super::parse::{COMMANDS, Section};
use crate::catalog::{CounterCorrection, OrderReset, ProductView};

pub const PRODUCT_NOT_FOUND: &str = "No product found with that ID.";
pub const CATEGORY_NOT_FOUND: &str = "No category found with that ID.";
pub const INVALID_PRODUCT_ID: &str = "Invalid product ID.";
pub const INVALID_CATEGORY_ID: &str = "Invalid category ID.";
pub const INVALID_PRICE: &str = "Invalid price value.";
pub const INVALID_CATEGORY: &str = "Invalid category.";
pub const MISSING_PRODUCT_ID: &str = "Please provide a product ID.";
pub const IMAGE_REQUIRED: &str = "Please attach an image with this command.";
pub const UPLOADING_IMAGE: &str = "Uploading image...";

pub const FETCH_PRODUCT_FAILED: &str = "Error fetching product details.";
pub const UPDATE_PRICE_FAILED: &str = "Error updating product price.";
pub const UPDATE_NAME_FAILED: &str = "Error updating product name.";
pub const UPLOAD_FAILED: &str = "Error uploading image.";
pub const UPDATE_IMAGE_FAILED: &str = "Error updating product image.";
pub const FETCH_CATEGORY_FAILED: &str = "Error fetching category details.";
pub const ADD_PRODUCT_FAILED: &str = "Error adding product.";
pub const UPDATE_CATEGORY_FAILED: &str = "Error updating category details.";
pub const UPDATE_PRODUCT_ORDER_FAILED: &str = "Error updating product order.";
pub const DELETE_FAILED: &str = "Error deleting product.";
pub const FETCH_CATEGORIES_FAILED: &str = "Error fetching categories.";
pub const CATEGORY_EXISTS: &str = "Category code already exists.";
pub const ADD_CATEGORY_FAILED: &str = "Error adding category.";
pub const UPDATE_CATEGORY_NAME_FAILED: &str = "Error updating category name.";
pub const UPDATE_CATEGORY_ORDER_FAILED: &str = "Error updating category order.";
pub const FETCH_DELETED_FAILED: &str = "Error fetching deleted products.";
pub const ID_IN_USE: &str = "A live product already uses that ID.";
pub const RESTORE_FAILED: &str = "Error restoring product.";
pub const REFRESH_FAILED: &str = "Error refreshing category list.";
pub const RECOUNT_FAILED: &str = "Error recounting categories.";

pub const PRODUCT_ADDED: &str = "Product added successfully.";
pub const CATEGORY_ADDED: &str = "Category added successfully.";
pub const ORDER_RESET: &str = "Category order reset.";
pub const CATEGORIES_REFRESHED: &str = "Category list updated.";
pub const NO_DELETED_PRODUCTS: &str = "No deleted products.";
pub const COUNTERS_UP_TO_DATE: &str = "Category counters are up to date.";

/// Longest text Telegram accepts in one message, in characters.
pub const MESSAGE_LIMIT: usize = 4096;

/// Caption of the `get` reply.
#[must_use]
pub fn product_caption(view: &ProductView) -> String {
    let product = &view.product;
    let category = view
        .category_name
        .as_deref()
        .unwrap_or_else(|| product.category.as_str());
    format!(
        "Product ID: {}\nName: {}\nCategory: {} - {}\nPrice: {}\nDiscounted Price: {}",
        product.id,
        product.name,
        category,
        product.sort_position,
        product.price,
        product.discounted_price,
    )
}

#[must_use]
pub fn price_updated(product: &Product) -> String {
    format!(
        "Price updated for product ID {}. New price: {}",
        product.id, product.discounted_price
    )
}

#[must_use]
pub fn name_updated(product: &Product) -> String {
    format!(
        "Name updated for product ID {}. New name: {}",
        product.id, product.name
    )
}

#[must_use]
pub fn category_updated(id: ProductId, category_name: &str) -> String {
    format!("Category updated for product ID {id}. New category: {category_name}")
}

#[must_use]
pub fn image_updated(id: ProductId) -> String {
    format!("Image updated for product ID {id}.")
}

#[must_use]
pub fn product_order_updated(a: ProductId, b: ProductId) -> String {
    format!("Order updated for product ID {a} and {b}.")
}

#[must_use]
pub fn product_deleted(id: ProductId) -> String {
    format!("Product ID {id} deleted.")
}

#[must_use]
pub fn product_restored(id: ProductId) -> String {
    format!("Product ID {id} restored.")
}

#[must_use]
pub fn category_name_updated(category: &Category) -> String {
    format!(
        "Name updated for category ID {}. New name: {}",
        category.id, category.name
    )
}

#[must_use]
pub fn category_order_updated(a: CategoryId, b: CategoryId) -> String {
    format!("Order updated for category ID {a} and {b}.")
}

/// `getcat` listing; categories are expected in listing order.
#[must_use]
pub fn category_list(categories: &[Category]) -> String {
    let lines: Vec<String> = categories
        .iter()
        .map(|c| {
            let order = c.order.map_or_else(|| "-".to_string(), |o| o.to_string());
            format!(
                "{order}) {} - {} - {} ({})",
                c.id, c.code, c.name, c.product_count
            )
        })
        .collect();
    format!("Categories\n\n\t\t\t\tId - Name\n{}", lines.join("\n"))
}

/// `vdeleted` listing.
#[must_use]
pub fn deleted_list(products: &[Product]) -> String {
    if products.is_empty() {
        return NO_DELETED_PRODUCTS.to_string();
    }

    let lines: Vec<String> = products
        .iter()
        .map(|p| format!("{} - {} - {}", p.id, p.name, p.price))
        .collect();
    format!("Deleted Products\n\nId - Name - Price\n{}", lines.join("\n"))
}

/// Split a reply into messages of at most `limit` characters.
///
/// Breaks fall on line boundaries; a single line longer than `limit` is cut
/// on character boundaries.
#[must_use]
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for line in text.split('\n') {
        for piece in line_pieces(line, limit) {
            let len = piece.chars().count();
            match current.as_mut() {
                Some((chunk, used)) if *used + 1 + len <= limit => {
                    chunk.push('\n');
                    chunk.push_str(&piece);
                    *used += 1 + len;
                }
                _ => {
                    chunks.extend(current.take().map(|(chunk, _)| chunk));
                    current = Some((piece, len));
                }
            }
        }
    }
    chunks.extend(current.map(|(chunk, _)| chunk));
    chunks
}

fn line_pieces(line: &str, limit: usize) -> Vec<String> {
    if line.chars().count() <= limit {
        return vec![line.to_string()];
    }
    line.chars()
        .collect::<Vec<_>>()
        .chunks(limit)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[must_use]
pub fn order_reset(report: &OrderReset) -> String {
    if report.unranked.is_empty() {
        return ORDER_RESET.to_string();
    }

    let codes: Vec<&str> = report.unranked.iter().map(|c| c.as_str()).collect();
    format!(
        "{ORDER_RESET}\nNo baseline rank for: {} (left unchanged)",
        codes.join(", ")
    )
}

#[must_use]
pub fn recount(corrections: &[CounterCorrection]) -> String {
    if corrections.is_empty() {
        return COUNTERS_UP_TO_DATE.to_string();
    }

    let mut text = String::from("Category counters corrected:");
    for c in corrections {
        let _ = write!(text, "\n{}: {} -> {}", c.code, c.before, c.after);
    }
    text
}

/// Help listing of every command.
#[must_use]
pub fn help() -> String {
    let mut text = String::from("Commands:\n");
    for (section, title) in [
        (Section::Product, "Product Commands:"),
        (Section::Category, "Category Commands:"),
        (Section::Deleted, "Deleted Products:"),
        (Section::Other, "Other Commands:"),
    ] {
        let _ = write!(text, "\n{title}\n");
        for info in COMMANDS.iter().filter(|info| info.section == section) {
            let _ = writeln!(text, "{} - {}", info.usage, info.description);
        }
    }
    text
}
