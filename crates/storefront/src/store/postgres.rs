//! Direct `PostgreSQL` adapter.
//!
//! Rows cross the boundary as `jsonb`: writes go through
//! `jsonb_populate_record` so Postgres does the column typing, and reads come
//! back as `to_jsonb(row)`. Only the columns present in a written row are
//! listed, so database defaults (`id`, `created_at`) still apply.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{
    Filter, PersistentStore, Query, Row, StoreError, Table, check_column, require_filters,
    value_as_text,
};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and health checks.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Quoted column list for the keys of `row`.
fn column_list(row: &Row) -> Result<String, StoreError> {
    let columns = row
        .keys()
        .map(|c| check_column(c).map(|c| format!("\"{c}\"")))
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(StoreError::Decode("row has no columns".to_string()));
    }
    Ok(columns.join(", "))
}

/// `WHERE` clause comparing each column's text form to a bind parameter.
///
/// Parameters are numbered from `first_param`.
fn where_clause(alias: &str, filters: &[Filter], first_param: usize) -> Result<String, StoreError> {
    if filters.is_empty() {
        return Ok(String::new());
    }
    let clauses = filters
        .iter()
        .enumerate()
        .map(|(i, f)| {
            check_column(&f.column)
                .map(|c| format!("{alias}.\"{c}\"::text = ${}", first_param + i))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(" WHERE {}", clauses.join(" AND ")))
}

fn select_sql(table: Table, query: &Query) -> Result<String, StoreError> {
    let name = table.name();
    let projection = match &query.embed {
        Some(embed) => {
            let fk = check_column(&embed.foreign_key)?;
            let child = embed.table.name();
            format!(
                "to_jsonb(t.*) || jsonb_build_object('{child}', \
                 COALESCE((SELECT jsonb_agg(to_jsonb(c.*)) FROM {child} c WHERE c.\"{fk}\" = t.id), '[]'::jsonb))"
            )
        }
        None => "to_jsonb(t.*)".to_string(),
    };

    let mut sql = format!(
        "SELECT {projection} FROM {name} t{}",
        where_clause("t", &query.filters, 1)?
    );
    if let Some(order) = &query.order {
        let column = check_column(&order.column)?;
        let direction = if order.ascending { "ASC" } else { "DESC" };
        sql.push_str(&format!(" ORDER BY t.\"{column}\" {direction}"));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(sql)
}

fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(db_err.message().to_string());
    }
    StoreError::Database(e)
}

fn into_row(value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Decode(format!("expected a row object, got {other}"))),
    }
}

#[async_trait]
impl PersistentStore for PgStore {
    #[tracing::instrument(skip(self, row), fields(table = %table))]
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        let name = table.name();
        let columns = column_list(&row)?;
        let sql = format!(
            "INSERT INTO {name} ({columns}) \
             SELECT {columns} FROM jsonb_populate_record(NULL::{name}, $1) \
             RETURNING to_jsonb({name}.*)"
        );

        let value: Value = sqlx::query_scalar(&sql)
            .bind(Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        into_row(value)
    }

    #[tracing::instrument(skip(self, query), fields(table = %table))]
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError> {
        let sql = select_sql(table, query)?;
        let mut q = sqlx::query_scalar::<_, Value>(&sql);
        for filter in &query.filters {
            q = q.bind(value_as_text(&filter.value));
        }
        let values = q.fetch_all(&self.pool).await.map_err(map_db_error)?;
        values.into_iter().map(into_row).collect()
    }

    #[tracing::instrument(skip(self, filters, patch), fields(table = %table))]
    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> Result<Vec<Row>, StoreError> {
        require_filters("update", table, filters)?;
        let name = table.name();
        let assignments = patch
            .keys()
            .map(|c| check_column(c).map(|c| format!("\"{c}\" = src.\"{c}\"")))
            .collect::<Result<Vec<_>, _>>()?;
        if assignments.is_empty() {
            return Err(StoreError::Decode("patch has no columns".to_string()));
        }
        let sql = format!(
            "UPDATE {name} t SET {} FROM jsonb_populate_record(NULL::{name}, $1) src{} \
             RETURNING to_jsonb(t.*)",
            assignments.join(", "),
            where_clause("t", filters, 2)?
        );

        let mut q = sqlx::query_scalar::<_, Value>(&sql).bind(Value::Object(patch));
        for filter in filters {
            q = q.bind(value_as_text(&filter.value));
        }
        let values = q.fetch_all(&self.pool).await.map_err(map_db_error)?;
        values.into_iter().map(into_row).collect()
    }

    #[tracing::instrument(skip(self, filters), fields(table = %table))]
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError> {
        require_filters("delete", table, filters)?;
        let sql = format!(
            "DELETE FROM {} t{}",
            table.name(),
            where_clause("t", filters, 1)?
        );
        let mut q = sqlx::query(&sql);
        for filter in filters {
            q = q.bind(value_as_text(&filter.value));
        }
        let result = q.execute(&self.pool).await.map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_select_sql_with_embed_order_and_limit() {
        let query = Query::new()
            .eq("user_id", "u1")
            .order_by("created_at", false)
            .limit(10)
            .embed(Table::Payment, "subscription_id");
        let sql = select_sql(Table::Subscription, &query).unwrap();

        assert!(sql.starts_with("SELECT to_jsonb(t.*) || jsonb_build_object('payment'"));
        assert!(sql.contains("FROM payment c WHERE c.\"subscription_id\" = t.id"));
        assert!(sql.contains("FROM subscription t WHERE t.\"user_id\"::text = $1"));
        assert!(sql.ends_with("ORDER BY t.\"created_at\" DESC LIMIT 10"));
    }

    #[test]
    fn test_where_clause_numbering() {
        let clause = where_clause(
            "t",
            &[Filter::eq("id", "a"), Filter::eq("status", "ACTIVE")],
            2,
        )
        .unwrap();
        assert_eq!(clause, " WHERE t.\"id\"::text = $2 AND t.\"status\"::text = $3");
        assert_eq!(where_clause("t", &[], 1).unwrap(), "");
    }

    #[tokio::test]
    async fn test_unfiltered_mutations_are_refused() {
        // Never connects: the guard runs before the pool is used.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://vitalis@localhost/vitalis")
            .unwrap();
        let store = PgStore::new(pool);

        let mut patch = Row::new();
        patch.insert("status".into(), json!("CANCELED"));
        let err = store.update(Table::Subscription, &[], patch).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unfiltered { op: "update", table: Table::Subscription }
        ));

        let err = store.delete(Table::Campaign, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Unfiltered { op: "delete", .. }));
    }

    #[test]
    fn test_column_list_rejects_injection() {
        let mut row = Row::new();
        row.insert("name".into(), json!("x"));
        assert_eq!(column_list(&row).unwrap(), "\"name\"");

        row.insert("name\" = 1; --".into(), json!("x"));
        assert!(matches!(column_list(&row), Err(StoreError::InvalidColumn(_))));
    }
}
