//! `PostgreSQL` implementation of the catalog store.
//!
//! Statements are built at runtime because table names come from
//! configuration. Every identifier is validated and double-quoted; values
//! are always bound. Rows travel as `jsonb` so the adapter does not need to
//! know the full column set: reads return `to_jsonb(t)` and writes go
//! through `jsonb_populate_record`, which casts each field to the column's
//! own type.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::QueryScalar;
use tracing::{debug, instrument};

use super::{
    CatalogStore, Filter, FilterValue, Record, RepositoryError, Table, TableNames,
    validate_identifier,
};

/// Catalog store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
    tables: TableNames,
}

impl std::fmt::Debug for PgCatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCatalogStore")
            .field("tables", &self.tables)
            .finish_non_exhaustive()
    }
}

impl PgCatalogStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool, tables: TableNames) -> Self {
        Self { pool, tables }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The configured table names.
    #[must_use]
    pub const fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Check that the database answers and every table is readable.
    ///
    /// # Errors
    ///
    /// Returns the first failing query.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        for table in [Table::Products, Table::Categories, Table::DeletedProducts] {
            let sql = format!(
                "SELECT 1 FROM {} LIMIT 1",
                quote_identifier(self.tables.resolve(table))
            );
            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(classify)?;
        }

        Ok(())
    }

    fn table(&self, table: Table) -> String {
        quote_identifier(self.tables.resolve(table))
    }

    async fn fetch_rows(
        &self,
        sql: &str,
        bind: impl FnOnce(QueryScalar<'_, Postgres, Value, PgArguments>) -> QueryScalar<'_, Postgres, Value, PgArguments>,
    ) -> Result<Vec<Record>, RepositoryError> {
        let query = bind(sqlx::query_scalar::<_, Value>(sql));
        let rows = query.fetch_all(&self.pool).await.map_err(classify)?;
        rows.into_iter().map(into_record).collect()
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self), fields(filter = %filter))]
    async fn fetch_one(&self, table: Table, filter: &Filter) -> Result<Record, RepositoryError> {
        let sql = select_sql(&self.table(table), Some(checked(filter.column)?), Some(2));
        let mut rows = self
            .fetch_rows(&sql, |query| bind_filter(query, &filter.value))
            .await?;

        match rows.len() {
            0 => Err(RepositoryError::NotFound),
            1 => rows.pop().ok_or(RepositoryError::NotFound),
            _ => Err(RepositoryError::DataCorruption(format!(
                "more than one {table} row matches {filter}"
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_all(
        &self,
        table: Table,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>, RepositoryError> {
        let column = filter.map(|f| checked(f.column)).transpose()?;
        let sql = select_sql(&self.table(table), column, None);
        let rows = self
            .fetch_rows(&sql, |query| match filter {
                Some(filter) => bind_filter(query, &filter.value),
                None => query,
            })
            .await?;

        debug!(rows = rows.len(), "Fetched rows");
        Ok(rows)
    }

    #[instrument(skip(self, fields), fields(filter = %filter))]
    async fn upsert_one(
        &self,
        table: Table,
        filter: &Filter,
        fields: Record,
    ) -> Result<Record, RepositoryError> {
        let columns = record_columns(&fields)?;
        let sql = update_sql(&self.table(table), &columns, checked(filter.column)?);
        let mut rows = self
            .fetch_rows(&sql, |query| {
                bind_filter(query.bind(Value::Object(fields)), &filter.value)
            })
            .await?;

        if rows.len() > 1 {
            tracing::warn!(rows = rows.len(), "Update matched more than one row");
        }

        if rows.is_empty() {
            return Err(RepositoryError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    #[instrument(skip(self, record))]
    async fn insert_one(&self, table: Table, record: Record) -> Result<Record, RepositoryError> {
        let columns = record_columns(&record)?;
        let sql = insert_sql(&self.table(table), &columns);
        let mut rows = self
            .fetch_rows(&sql, |query| query.bind(Value::Object(record)))
            .await?;

        rows.pop().ok_or_else(|| {
            RepositoryError::DataCorruption(format!("insert into {table} returned no row"))
        })
    }

    #[instrument(skip(self), fields(filter = %filter))]
    async fn delete_one(&self, table: Table, filter: &Filter) -> Result<(), RepositoryError> {
        let sql = delete_sql(&self.table(table), checked(filter.column)?);
        let query = sqlx::query(&sql);
        let query = match &filter.value {
            FilterValue::Int(value) => query.bind(*value),
            FilterValue::Text(value) => query.bind(value.clone()),
        };

        let result = query.execute(&self.pool).await.map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn bind_filter<'q>(
    query: QueryScalar<'q, Postgres, Value, PgArguments>,
    value: &FilterValue,
) -> QueryScalar<'q, Postgres, Value, PgArguments> {
    match value {
        FilterValue::Int(value) => query.bind(*value),
        FilterValue::Text(value) => query.bind(value.clone()),
    }
}

fn into_record(value: Value) -> Result<Record, RepositoryError> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(RepositoryError::DataCorruption(format!(
            "expected a row object, got {other}"
        ))),
    }
}

fn checked(column: &str) -> Result<&str, RepositoryError> {
    validate_identifier(column).map_err(|e| RepositoryError::InvalidInput(e.to_string()))?;
    Ok(column)
}

fn record_columns(record: &Record) -> Result<Vec<&str>, RepositoryError> {
    if record.is_empty() {
        return Err(RepositoryError::InvalidInput(
            "no columns to write".to_string(),
        ));
    }
    record.keys().map(|key| checked(key)).collect()
}

/// Map sqlx errors onto repository errors by SQLSTATE.
fn classify(error: sqlx::Error) -> RepositoryError {
    if matches!(error, sqlx::Error::RowNotFound) {
        return RepositoryError::NotFound;
    }

    if matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return RepositoryError::Unavailable(error.to_string());
    }

    if let sqlx::Error::Database(db) = &error {
        if let Some(classified) = classify_code(db.code().as_deref(), db.message()) {
            return classified;
        }
    }

    RepositoryError::Database(error)
}

/// Map a SQLSTATE code to a repository error, if it has a specific one.
fn classify_code(code: Option<&str>, message: &str) -> Option<RepositoryError> {
    let message = message.to_string();
    match code? {
        // invalid_text_representation, numeric_value_out_of_range,
        // invalid_parameter_value, not_null_violation, check_violation
        "22P02" | "22003" | "22023" | "23502" | "23514" => {
            Some(RepositoryError::InvalidInput(message))
        }
        "23505" => Some(RepositoryError::Duplicate(message)),
        "23503" => Some(RepositoryError::Conflict(message)),
        _ => None,
    }
}

/// Double-quote every part of a (possibly schema-qualified) identifier.
fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_sql(table: &str, filter_column: Option<&str>, limit: Option<u32>) -> String {
    let mut sql = format!("SELECT to_jsonb(t) FROM {table} AS t");
    if let Some(column) = filter_column {
        sql.push_str(&format!(" WHERE t.{} = $1", quote_identifier(column)));
    }
    sql.push_str(" ORDER BY t.\"id\"");
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let columns = column_list(columns);
    format!(
        "INSERT INTO {table} AS t ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
         RETURNING to_jsonb(t)"
    )
}

fn update_sql(table: &str, columns: &[&str], filter_column: &str) -> String {
    let column_names = column_list(columns);
    let target = if columns.len() == 1 {
        column_names.clone()
    } else {
        format!("({column_names})")
    };
    format!(
        "UPDATE {table} AS t SET {target} = \
         (SELECT {column_names} FROM jsonb_populate_record(NULL::{table}, $1)) \
         WHERE t.{} = $2 RETURNING to_jsonb(t)",
        quote_identifier(filter_column)
    )
}

fn delete_sql(table: &str, filter_column: &str) -> String {
    format!(
        "DELETE FROM {table} WHERE {} = $1",
        quote_identifier(filter_column)
    )
}
