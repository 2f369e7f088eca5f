//! Core types for Shelf.
//!
//! This module provides type-safe wrappers for the catalog's domain concepts.

pub mod catalog;
pub mod category_code;
pub mod id;
pub mod price;

pub use catalog::{Category, NewCategory, NewProduct, Product};
pub use category_code::{CategoryCode, CategoryCodeError};
pub use id::*;
pub use price::{PriceError, Pricing};
