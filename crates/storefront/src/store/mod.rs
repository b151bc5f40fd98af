//! Persistent store abstraction.
//!
//! The service reads and writes a handful of tables through a tiny
//! row-oriented interface: insert, filtered select (optionally embedding a
//! child table), update, and delete. Rows travel as JSON objects; typed
//! decoding happens one level up in [`crate::db`].
//!
//! # Adapters
//!
//! - [`RestStore`] - Supabase `PostgREST` over HTTP
//! - [`PgStore`] - direct `PostgreSQL` via sqlx
//! - [`MemoryStore`] - in-process tables for development and tests

mod memory;
mod postgres;
mod rest;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use postgres::{PgStore, create_pool};
pub use rest::RestStore;

/// A store row: column name → JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Tables the service touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    UserAccount,
    Address,
    Product,
    Subscription,
    Payment,
    Shipping,
    Campaign,
}

impl Table {
    /// Table name as it exists in the database.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UserAccount => "user_account",
            Self::Address => "address",
            Self::Product => "product",
            Self::Subscription => "subscription",
            Self::Payment => "payment",
            Self::Shipping => "shipping",
            Self::Campaign => "campaign",
        }
    }

    /// Whether the table carries a `created_at` column defaulted by the database.
    #[must_use]
    pub const fn has_created_at(self) -> bool {
        matches!(
            self,
            Self::UserAccount | Self::Address | Self::Subscription | Self::Campaign
        )
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Sort order for a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A child table embedded under each parent row.
///
/// Children are matched on `child.foreign_key = parent.id` and attached to
/// the parent under the child table's name (`"payment": [...]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub table: Table,
    pub foreign_key: String,
}

/// Select parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub embed: Option<Embed>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn embed(mut self, table: Table, foreign_key: impl Into<String>) -> Self {
        self.embed = Some(Embed {
            table,
            foreign_key: foreign_key.into(),
        });
        self
    }
}

/// Errors returned by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The REST endpoint answered with an error status.
    #[error("store API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A write violated a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The response was not the shape the adapter expects.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A column name that is not a plain identifier.
    #[error("invalid column name: {0}")]
    InvalidColumn(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An update or delete with no filters, which would touch every row.
    #[error("refusing to {op} every row of {table}")]
    Unfiltered { op: &'static str, table: Table },
}

/// Row-level access to the backing tables.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError>;

    /// Select rows matching every filter.
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Apply `patch` to every row matching `filters`; returns the updated rows.
    ///
    /// At least one filter is required.
    async fn update(&self, table: Table, filters: &[Filter], patch: Row)
    -> Result<Vec<Row>, StoreError>;

    /// Delete rows matching `filters`; returns how many were removed.
    ///
    /// At least one filter is required.
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Reject anything that isn't a plain lowercase identifier.
///
/// Column names end up inside SQL text and URL query keys.
pub(crate) fn check_column(column: &str) -> Result<&str, StoreError> {
    let valid = !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !column.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(column)
    } else {
        Err(StoreError::InvalidColumn(column.to_string()))
    }
}

/// Updates and deletes must be scoped by at least one filter.
pub(crate) fn require_filters(op: &'static str, table: Table, filters: &[Filter]) -> Result<(), StoreError> {
    if filters.is_empty() {
        Err(StoreError::Unfiltered { op, table })
    } else {
        Ok(())
    }
}

/// Render a filter value the way `PostgREST` and SQL text comparisons expect.
pub(crate) fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
