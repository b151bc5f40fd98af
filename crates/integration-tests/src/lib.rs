//! Integration test harness for the Vitalis storefront.
//!
//! Everything runs in-process: the axum router is driven with
//! `tower::ServiceExt::oneshot`, the persistent store is a [`MemoryStore`],
//! and the identity provider is a [`MemoryIdentityProvider`]. No database or
//! network is needed.
//!
//! # Test Categories
//!
//! - `order_workflow` - ordering, consistency, and failure isolation of order placement
//! - `session` - login, registration, and logout against the identity provider
//! - `api` - the JSON API end to end, including cart and admin routes

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::FixedOffset;
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tower::ServiceExt;
use url::Url;

use vitalis_core::{Email, UserId};
use vitalis_storefront::config::{StorefrontConfig, SupabaseConfig};
use vitalis_storefront::identity::{IdentityProvider, MemoryIdentityProvider, UserMetadata};
use vitalis_storefront::middleware::SessionBackend;
use vitalis_storefront::models::AddressInput;
use vitalis_storefront::state::AppState;
use vitalis_storefront::store::{MemoryStore, PersistentStore, Row, Table};

/// Configuration that never reaches the network.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        supabase: SupabaseConfig {
            url: Url::parse("https://example.supabase.co").unwrap(),
            anon_key: SecretString::from("test-anon-key"),
            service_role_key: None,
        },
        database_url: None,
        store_timeout: Duration::from_secs(2),
        fallback_utc_offset: FixedOffset::east_opt(0).unwrap(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A complete checkout address.
#[must_use]
pub fn sample_address() -> AddressInput {
    AddressInput {
        full_name: "Ada Lovelace".to_string(),
        street_address: "12 Analytical Way".to_string(),
        apartment: Some("Unit 3".to_string()),
        city: "Portland".to_string(),
        state: "OR".to_string(),
        postal_code: "97201".to_string(),
        country: "US".to_string(),
        phone: None,
        is_default: true,
    }
}

/// [`sample_address`] as request JSON.
#[must_use]
pub fn sample_address_json() -> Value {
    serde_json::to_value(sample_address()).unwrap()
}

/// Provider metadata with a `full_name`.
#[must_use]
pub fn metadata(full_name: &str) -> UserMetadata {
    let mut metadata = Map::new();
    metadata.insert("full_name".to_string(), json!(full_name));
    metadata
}

/// Register a provider account with a fixed id.
pub async fn add_account(
    identity: &MemoryIdentityProvider,
    id: &str,
    email: &str,
    password: &str,
    full_name: &str,
) {
    identity
        .add_account(
            UserId::new(id),
            &Email::parse(email).unwrap(),
            password,
            metadata(full_name),
        )
        .await
        .unwrap();
}

/// Insert a `user_account` row directly.
pub async fn seed_user(store: &MemoryStore, id: &str, email: &str, is_admin: bool) {
    store
        .seed(Table::UserAccount, row(json!({
            "id": id,
            "full_name": "Seeded User",
            "email": email,
            "is_admin": is_admin,
        })))
        .await;
}

/// A JSON object as a store row.
#[must_use]
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// The router plus handles on its doubles, with a cookie jar of one.
///
/// Clones share the router and doubles but keep their own copy of the cookie.
#[derive(Clone)]
pub struct TestApp {
    pub store: MemoryStore,
    pub identity: MemoryIdentityProvider,
    router: Router,
    cookie: Option<String>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let identity = MemoryIdentityProvider::new();
        let state = AppState::new(
            test_config(),
            Arc::new(store.clone()) as Arc<dyn PersistentStore>,
            Arc::new(identity.clone()) as Arc<dyn IdentityProvider>,
            SessionBackend::in_memory(),
        );
        Self {
            store,
            identity,
            router: vitalis_storefront::app(state),
            cookie: None,
        }
    }

    /// Forget the session cookie.
    pub fn sign_out_locally(&mut self) {
        self.cookie = None;
    }

    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Log in through the API and keep the session cookie.
    pub async fn login(&mut self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/auth/login",
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }
}
