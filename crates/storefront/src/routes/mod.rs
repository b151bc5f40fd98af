//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (store reachable)
//!
//! # Auth
//! POST /api/auth/register              - Create an identity-provider account
//! POST /api/auth/login                 - Sign in, mirror the account, load subscriptions
//! POST /api/auth/logout                - Sign out
//! GET  /api/auth/me                    - Current user and subscriptions
//!
//! # Catalog & pricing
//! GET  /api/products                   - Product listing
//! GET  /api/products/{id}              - Product detail
//! GET  /api/pricing/quote              - Subscription price for product + frequency
//! GET  /api/pricing/distributor        - Distributor package price
//!
//! # Cart (session-backed)
//! GET  /api/cart                       - Cart contents and totals
//! POST /api/cart/add|update|remove|clear
//! POST /api/cart/checkout              - One order per subscription unit
//!
//! # Orders & account (requires auth)
//! POST /api/orders                     - Place a subscription order
//! GET  /api/account/subscriptions      - Subscriptions with payments
//! GET  /api/account/addresses          - Saved addresses
//!
//! # Admin (requires is_admin)
//! /api/admin/{campaigns,products,users,subscriptions,payments,shipments}
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod pricing;
pub mod products;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejections use the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Success envelope: `{"success": true, ...body}`.
///
/// `T` must serialize as a map.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

/// Wrap a response body in the success envelope.
pub const fn success<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        body,
    })
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the pricing routes router.
pub fn pricing_routes() -> Router<AppState> {
    Router::new()
        .route("/quote", get(pricing::quote))
        .route("/distributor", get(pricing::distributor))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/checkout", post(cart::checkout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", get(account::subscriptions))
        .route("/addresses", get(account::addresses))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        .nest("/api/pricing", pricing_routes())
        .nest("/api/cart", cart_routes())
        .route("/api/orders", post(orders::create))
        .nest("/api/account", account_routes())
        .nest("/api/admin", admin::router())
}

/// Build the full application router with session, request-id, and trace
/// layers.
///
/// Sentry layers are added by the binary, outside this router.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.sessions().clone(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(session_layer)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
