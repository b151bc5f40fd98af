//! Supabase `PostgREST` adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use super::{
    Filter, PersistentStore, Query, Row, StoreError, Table, check_column, require_filters,
    value_as_text,
};

/// Store backed by the Supabase REST API (`/rest/v1/{table}`).
#[derive(Clone)]
pub struct RestStore {
    inner: Arc<RestStoreInner>,
}

struct RestStoreInner {
    client: reqwest::Client,
    base: Url,
    api_key: SecretString,
}

impl RestStore {
    /// Create a REST store for a Supabase project.
    ///
    /// `timeout` bounds every HTTP request the adapter makes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Http` if the HTTP client cannot be built, or
    /// `StoreError::Decode` if the project URL cannot be extended.
    pub fn new(project_url: &Url, api_key: SecretString, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base = project_url
            .join("rest/v1/")
            .map_err(|e| StoreError::Decode(format!("invalid project URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(RestStoreInner {
                client,
                base,
                api_key,
            }),
        })
    }

    fn table_url(&self, table: Table) -> Result<Url, StoreError> {
        self.inner
            .base
            .join(table.name())
            .map_err(|e| StoreError::Decode(format!("invalid table URL: {e}")))
    }

    /// Send a request with the Supabase headers and return the parsed body.
    async fn execute(&self, method: Method, url: Url, body: Option<&Row>) -> Result<Value, StoreError> {
        let key = self.inner.api_key.expose_secret();
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
            .header("Prefer", "return=representation");
        if let Some(row) = body {
            request = request.json(row);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Store API returned non-success status"
            );
            return Err(api_error(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse store API response"
            );
            StoreError::Decode(e.to_string())
        })
    }
}

/// Map a `PostgREST` error body to a `StoreError`.
fn api_error(status: StatusCode, body: &str) -> StoreError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map_or_else(|| body.chars().take(200).collect(), str::to_string);

    if status == StatusCode::CONFLICT || code == "23505" {
        return StoreError::Conflict(message);
    }
    if status.is_server_error() {
        return StoreError::Unavailable(format!("HTTP {status}: {message}"));
    }
    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}

fn push_filters(url: &mut Url, filters: &[Filter]) -> Result<(), StoreError> {
    let mut pairs = url.query_pairs_mut();
    for filter in filters {
        let column = check_column(&filter.column)?;
        pairs.append_pair(column, &format!("eq.{}", value_as_text(&filter.value)));
    }
    Ok(())
}

fn into_rows(value: Value) -> Result<Vec<Row>, StoreError> {
    let Value::Array(items) = value else {
        return Err(StoreError::Decode("expected a JSON array of rows".to_string()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            other => Err(StoreError::Decode(format!("expected a row object, got {other}"))),
        })
        .collect()
}

#[async_trait]
impl PersistentStore for RestStore {
    #[tracing::instrument(skip(self, row), fields(table = %table))]
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        let url = self.table_url(table)?;
        let body = self.execute(Method::POST, url, Some(&row)).await?;
        into_rows(body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    #[tracing::instrument(skip(self, query), fields(table = %table))]
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError> {
        let mut url = self.table_url(table)?;
        let select = match &query.embed {
            Some(embed) => format!("*,{}(*)", embed.table.name()),
            None => "*".to_string(),
        };
        url.query_pairs_mut().append_pair("select", &select);
        push_filters(&mut url, &query.filters)?;
        if let Some(order) = &query.order {
            let column = check_column(&order.column)?;
            let direction = if order.ascending { "asc" } else { "desc" };
            url.query_pairs_mut()
                .append_pair("order", &format!("{column}.{direction}"));
        }
        if let Some(limit) = query.limit {
            url.query_pairs_mut().append_pair("limit", &limit.to_string());
        }

        into_rows(self.execute(Method::GET, url, None).await?)
    }

    #[tracing::instrument(skip(self, filters, patch), fields(table = %table))]
    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> Result<Vec<Row>, StoreError> {
        require_filters("update", table, filters)?;
        let mut url = self.table_url(table)?;
        push_filters(&mut url, filters)?;
        into_rows(self.execute(Method::PATCH, url, Some(&patch)).await?)
    }

    #[tracing::instrument(skip(self, filters), fields(table = %table))]
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError> {
        require_filters("delete", table, filters)?;
        let mut url = self.table_url(table)?;
        push_filters(&mut url, filters)?;
        let removed = into_rows(self.execute(Method::DELETE, url, None).await?)?;
        Ok(u64::try_from(removed.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut url = self.table_url(Table::Product)?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "1");
        self.execute(Method::GET, url, None).await.map(|_| ())
    }
}
