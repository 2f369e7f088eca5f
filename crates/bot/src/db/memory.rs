//! In-memory catalog store for tests and dry runs.
//!
//! Behaves like the `PostgreSQL` store for the primitives the catalog uses:
//! ids are assigned on insert, a duplicate id is a conflict, and a filter
//! that matches nothing is `NotFound`. Any single call of an operation can
//! be made to fail to exercise partial-failure paths.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{CatalogStore, Filter, FilterValue, Record, RepositoryError, Table};

/// Primitive operations, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchOne,
    FetchAll,
    Upsert,
    Insert,
    Delete,
}

/// A pending failure: fires on the `remaining`-th matching call.
#[derive(Debug)]
struct Failure {
    table: Table,
    operation: Operation,
    remaining: usize,
    error: RepositoryError,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<Table, Vec<Record>>,
    next_id: i64,
    failures: Vec<Failure>,
    reads: usize,
    writes: usize,
}

impl State {
    fn take_failure(&mut self, table: Table, operation: Operation) -> Result<(), RepositoryError> {
        let mut fired = None;
        for (index, failure) in self.failures.iter_mut().enumerate() {
            if failure.table != table || failure.operation != operation {
                continue;
            }
            failure.remaining = failure.remaining.saturating_sub(1);
            if failure.remaining == 0 && fired.is_none() {
                fired = Some(index);
            }
        }

        match fired {
            Some(index) => Err(self.failures.remove(index).error),
            None => Ok(()),
        }
    }

    fn rows(&mut self, table: Table) -> &mut Vec<Record> {
        self.tables.entry(table).or_default()
    }

    fn assign_id(&mut self, record: &mut Record) -> Result<i64, RepositoryError> {
        match record.get("id") {
            None | Some(Value::Null) => {
                self.next_id += 1;
                record.insert("id".to_owned(), Value::from(self.next_id));
                Ok(self.next_id)
            }
            Some(value) => {
                let id = value.as_i64().ok_or_else(|| {
                    RepositoryError::InvalidInput(format!("id must be an integer, got {value}"))
                })?;
                self.next_id = self.next_id.max(id);
                Ok(id)
            }
        }
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, bypassing counters and failure injection.
    ///
    /// Rows without an id get one assigned.
    pub async fn seed(&self, table: Table, rows: impl IntoIterator<Item = Value>) {
        let mut state = self.state.lock().await;
        for row in rows {
            let Value::Object(mut record) = row else {
                continue;
            };
            if state.assign_id(&mut record).is_ok() {
                state.rows(table).push(record);
            }
        }
    }

    /// Snapshot of a table, ordered by id.
    pub async fn rows(&self, table: Table) -> Vec<Record> {
        let mut state = self.state.lock().await;
        let mut rows = state.rows(table).clone();
        rows.sort_by_key(record_id);
        rows
    }

    /// Make the next `operation` on `table` fail with `Unavailable`.
    pub async fn fail_next(&self, table: Table, operation: Operation) {
        self.fail_nth(table, operation, 1).await;
    }

    /// Make the `n`-th upcoming `operation` on `table` fail with
    /// `Unavailable`; `n` counts from 1.
    pub async fn fail_nth(&self, table: Table, operation: Operation, n: usize) {
        let error =
            RepositoryError::Unavailable(format!("injected {operation:?} failure on {table}"));
        self.fail_nth_with(table, operation, n, error).await;
    }

    /// Make the `n`-th upcoming `operation` on `table` fail with `error`.
    pub async fn fail_nth_with(
        &self,
        table: Table,
        operation: Operation,
        n: usize,
        error: RepositoryError,
    ) {
        self.state.lock().await.failures.push(Failure {
            table,
            operation,
            remaining: n.max(1),
            error,
        });
    }

    /// Number of successful writes (upsert, insert, delete).
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    /// Number of successful reads (fetch one, fetch all).
    pub async fn read_count(&self) -> usize {
        self.state.lock().await.reads
    }
}

fn record_id(record: &Record) -> i64 {
    record.get("id").and_then(Value::as_i64).unwrap_or(i64::MAX)
}

/// Compare a stored value with a filter value.
///
/// Numbers and numeric strings compare equal, as they would after a cast.
fn matches(record: &Record, filter: &Filter) -> bool {
    let Some(value) = record.get(filter.column) else {
        return false;
    };

    match (&filter.value, value) {
        (FilterValue::Int(expected), Value::Number(n)) => n.as_i64() == Some(*expected),
        (FilterValue::Int(expected), Value::String(s)) => s.parse::<i64>().ok() == Some(*expected),
        (FilterValue::Text(expected), Value::String(s)) => s == expected,
        (FilterValue::Text(expected), Value::Number(n)) => n.to_string() == *expected,
        _ => false,
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn fetch_one(&self, table: Table, filter: &Filter) -> Result<Record, RepositoryError> {
        let mut state = self.state.lock().await;
        state.take_failure(table, Operation::FetchOne)?;

        let mut found: Vec<&Record> = state
            .tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| matches(r, filter)).collect())
            .unwrap_or_default();

        let record = match found.len() {
            0 => return Err(RepositoryError::NotFound),
            1 => found.pop().cloned().ok_or(RepositoryError::NotFound)?,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "more than one {table} row matches {filter}"
                )));
            }
        };

        state.reads += 1;
        Ok(record)
    }

    async fn fetch_all(
        &self,
        table: Table,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>, RepositoryError> {
        let mut state = self.state.lock().await;
        state.take_failure(table, Operation::FetchAll)?;

        let mut rows: Vec<Record> = state
            .rows(table)
            .iter()
            .filter(|r| filter.is_none_or(|f| matches(r, f)))
            .cloned()
            .collect();
        rows.sort_by_key(record_id);

        state.reads += 1;
        Ok(rows)
    }

    async fn upsert_one(
        &self,
        table: Table,
        filter: &Filter,
        fields: Record,
    ) -> Result<Record, RepositoryError> {
        let mut state = self.state.lock().await;
        state.take_failure(table, Operation::Upsert)?;

        let row = state
            .rows(table)
            .iter_mut()
            .find(|r| matches(r, filter))
            .ok_or(RepositoryError::NotFound)?;
        for (column, value) in fields {
            row.insert(column, value);
        }
        let updated = row.clone();

        state.writes += 1;
        Ok(updated)
    }

    async fn insert_one(&self, table: Table, mut record: Record) -> Result<Record, RepositoryError> {
        let mut state = self.state.lock().await;
        state.take_failure(table, Operation::Insert)?;

        let id = match record.get("id") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_i64().ok_or_else(|| {
                RepositoryError::InvalidInput(format!("id must be an integer, got {value}"))
            })?),
        };
        if let Some(id) = id.filter(|&id| state.rows(table).iter().any(|r| record_id(r) == id)) {
            return Err(RepositoryError::Duplicate(format!(
                "duplicate key value violates unique constraint: id={id}"
            )));
        }

        state.assign_id(&mut record)?;
        state.rows(table).push(record.clone());

        state.writes += 1;
        Ok(record)
    }

    async fn delete_one(&self, table: Table, filter: &Filter) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.take_failure(table, Operation::Delete)?;

        let rows = state.rows(table);
        let before = rows.len();
        rows.retain(|r| !matches(r, filter));
        if rows.len() == before {
            return Err(RepositoryError::NotFound);
        }

        state.writes += 1;
        Ok(())
    }
}
