//! Catalog store adapter.
//!
//! # Tables
//!
//! - products - Live catalog products
//! - categories - Categories with their listing rank and product counter
//! - deleted products - Soft-deleted products (same columns as products)
//!
//! The physical names depend on the deployment (see [`TableNames`]); the
//! schema itself is managed outside this crate.
//!
//! # Primitives
//!
//! [`CatalogStore`] exposes five primitive operations. Each one is committed
//! on its own: there is no transaction spanning several calls, so a
//! multi-step catalog command that fails halfway leaves its earlier writes
//! in place.

pub mod categories;
pub mod deleted;
mod memory;
mod postgres;
pub mod products;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shelf_core::{CategoryCode, CategoryId, ProductId};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::{MemoryStore, Operation};
pub use postgres::PgCatalogStore;

/// A table row as a JSON object keyed by column name.
pub type Record = Map<String, Value>;

/// Maximum length of a `PostgreSQL` identifier.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// A row with the same key already exists.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Any other constraint violation (e.g., a foreign key).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A value does not fit the column type (e.g., text in a numeric column).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Logical catalog tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    Categories,
    DeletedProducts,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::DeletedProducts => "deleted_products",
        })
    }
}

/// A table or column name that cannot be used safely in SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier '{0}': use letters, digits and underscores, optionally schema-qualified")]
pub struct InvalidIdentifier(pub String);

/// Physical table names, validated as SQL identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    products: String,
    categories: String,
    deleted_products: String,
}

impl TableNames {
    /// Validate and build a set of table names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` for the first name that is not a plain or
    /// schema-qualified identifier.
    pub fn new(
        products: impl Into<String>,
        categories: impl Into<String>,
        deleted_products: impl Into<String>,
    ) -> Result<Self, InvalidIdentifier> {
        let names = Self {
            products: products.into(),
            categories: categories.into(),
            deleted_products: deleted_products.into(),
        };
        validate_identifier(&names.products)?;
        validate_identifier(&names.categories)?;
        validate_identifier(&names.deleted_products)?;
        Ok(names)
    }

    /// Live products table.
    #[must_use]
    pub fn products(&self) -> &str {
        &self.products
    }

    /// Categories table.
    #[must_use]
    pub fn categories(&self) -> &str {
        &self.categories
    }

    /// Soft-deleted products table.
    #[must_use]
    pub fn deleted_products(&self) -> &str {
        &self.deleted_products
    }

    /// Physical name of a logical table.
    #[must_use]
    pub fn resolve(&self, table: Table) -> &str {
        match table {
            Table::Products => &self.products,
            Table::Categories => &self.categories,
            Table::DeletedProducts => &self.deleted_products,
        }
    }
}

/// Value side of an equality filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<ProductId> for FilterValue {
    fn from(id: ProductId) -> Self {
        Self::Int(id.as_i64())
    }
}

impl From<CategoryId> for FilterValue {
    fn from(id: CategoryId) -> Self {
        Self::Int(id.as_i64())
    }
}

impl From<&CategoryCode> for FilterValue {
    fn from(code: &CategoryCode) -> Self {
        Self::Text(code.as_str().to_owned())
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Column name.
    pub column: &'static str,
    /// Value the column must equal.
    pub value: FilterValue,
}

impl Filter {
    /// `column = value`.
    #[must_use]
    pub fn eq(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

/// Remote table operations used by every catalog command.
///
/// Each call is committed independently.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Backend identifier for logging.
    fn backend_tag(&self) -> &'static str;

    /// Fetch the single row matching `filter`.
    ///
    /// Returns `NotFound` for zero rows and `DataCorruption` for more than one.
    async fn fetch_one(&self, table: Table, filter: &Filter) -> Result<Record, RepositoryError>;

    /// Fetch every row, optionally filtered, ordered by id.
    async fn fetch_all(
        &self,
        table: Table,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>, RepositoryError>;

    /// Update the row matching `filter` with `fields` and return it.
    ///
    /// Returns `NotFound` when no row matches.
    async fn upsert_one(
        &self,
        table: Table,
        filter: &Filter,
        fields: Record,
    ) -> Result<Record, RepositoryError>;

    /// Insert a row and return it as stored (with its assigned id).
    async fn insert_one(&self, table: Table, record: Record) -> Result<Record, RepositoryError>;

    /// Delete the row matching `filter`.
    ///
    /// Returns `NotFound` when no row matches.
    async fn delete_one(&self, table: Table, filter: &Filter) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound of pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Decode a record into a typed row.
///
/// # Errors
///
/// Returns `DataCorruption` if the record does not have the expected shape.
pub fn decode<T: DeserializeOwned>(table: Table, record: Record) -> Result<T, RepositoryError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| RepositoryError::DataCorruption(format!("{table} row: {e}")))
}

/// Encode a typed row into a record.
///
/// # Errors
///
/// Returns `InvalidInput` if the value does not serialize to a JSON object.
pub fn encode<T: Serialize>(value: &T) -> Result<Record, RepositoryError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(RepositoryError::InvalidInput(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(RepositoryError::InvalidInput(e.to_string())),
    }
}

/// Build a single-field record.
#[must_use]
pub fn field(column: &str, value: impl Into<Value>) -> Record {
    let mut record = Record::new();
    record.insert(column.to_owned(), value.into());
    record
}

/// Check that a name is a plain or schema-qualified SQL identifier.
///
/// # Errors
///
/// Returns `InvalidIdentifier` otherwise.
pub fn validate_identifier(name: &str) -> Result<(), InvalidIdentifier> {
    let valid = !name.is_empty()
        && name.split('.').count() <= 2
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && part.len() <= MAX_IDENTIFIER_LENGTH
        });

    if valid {
        Ok(())
    } else {
        Err(InvalidIdentifier(name.to_owned()))
    }
}
