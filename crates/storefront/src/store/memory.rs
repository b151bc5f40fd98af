//! In-process store for development and tests.
//!
//! Tables are plain vectors of rows. Every call is recorded in order, and a
//! call can be made to fail or stall for a given table/operation so tests can
//! drive each failure path of the order workflow.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Filter, PersistentStore, Query, Row, StoreError, Table, require_filters};

/// Kind of store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Insert,
    Select,
    Update,
    Delete,
}

/// One recorded store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub table: Table,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Row>>,
    calls: Vec<StoreCall>,
    failures: HashMap<(Table, StoreOp), String>,
    delays: HashMap<(Table, StoreOp), Duration>,
}

/// Store that keeps rows in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` on `table` fail with `StoreError::Unavailable`.
    pub async fn fail_on(&self, table: Table, op: StoreOp, message: impl Into<String>) {
        self.state
            .lock()
            .await
            .failures
            .insert((table, op), message.into());
    }

    /// Stall every `op` on `table` for `delay` before it runs.
    pub async fn delay_on(&self, table: Table, op: StoreOp, delay: Duration) {
        self.state.lock().await.delays.insert((table, op), delay);
    }

    /// Remove every injected failure and delay.
    pub async fn heal(&self) {
        let mut state = self.state.lock().await;
        state.failures.clear();
        state.delays.clear();
    }

    /// Calls made so far, oldest first.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    /// Snapshot of a table's rows.
    pub async fn rows(&self, table: Table) -> Vec<Row> {
        self.state
            .lock()
            .await
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a row without recording a call, for test fixtures.
    pub async fn seed(&self, table: Table, row: Row) {
        let mut state = self.state.lock().await;
        let row = with_defaults(table, row);
        state.tables.entry(table).or_default().push(row);
    }

    /// Record the call, then apply any injected delay or failure.
    async fn enter(&self, table: Table, op: StoreOp) -> Result<(), StoreError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.push(StoreCall { op, table });
            state.delays.get(&(table, op)).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().await;
        match state.failures.get(&(table, op)) {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

/// Fill in the columns the database would default.
fn with_defaults(table: Table, mut row: Row) -> Row {
    row.entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    if table.has_created_at() {
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    }
    row
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| row.get(&f.column).is_some_and(|v| loosely_equal(v, &f.value)))
}

/// Equality that treats `"42"` and `42` alike, as a text comparison would.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    a == b || super::value_as_text(a) == super::value_as_text(b)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => super::value_as_text(x).cmp(&super::value_as_text(y)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        self.enter(table, StoreOp::Insert).await?;
        let mut state = self.state.lock().await;
        let row = with_defaults(table, row);
        let rows = state.tables.entry(table).or_default();
        if rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint \"{table}_pkey\""
            )));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.enter(table, StoreOp::Select).await?;
        let state = self.state.lock().await;
        let mut rows: Vec<Row> = state
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        if let Some(embed) = &query.embed {
            let children = state.tables.get(&embed.table);
            for row in &mut rows {
                let nested: Vec<Value> = match (children, row.get("id")) {
                    (Some(children), Some(id)) => children
                        .iter()
                        .filter(|child| child.get(&embed.foreign_key) == Some(id))
                        .cloned()
                        .map(Value::Object)
                        .collect(),
                    _ => Vec::new(),
                };
                row.insert(embed.table.name().to_string(), Value::Array(nested));
            }
        }

        Ok(rows)
    }

    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> Result<Vec<Row>, StoreError> {
        self.enter(table, StoreOp::Update).await?;
        require_filters("update", table, filters)?;
        let mut state = self.state.lock().await;
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|row| matches(row, filters)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError> {
        self.enter(table, StoreOp::Delete).await?;
        require_filters("delete", table, filters)?;
        let mut state = self.state.lock().await;
        let Some(rows) = state.tables.get_mut(&table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches(row, filters));
        Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
