//! The JSON API driven through the full router.

use std::time::Duration;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use vitalis_integration_tests::{TestApp, add_account, row, sample_address_json, seed_user};
use vitalis_storefront::store::{StoreOp, Table};

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn signed_in_customer() -> TestApp {
    let mut app = TestApp::new();
    add_account(&app.identity, "u-cust", "cust@example.com", "password123", "Casey Customer").await;
    app.login("cust@example.com", "password123").await;
    app
}

async fn signed_in_admin() -> TestApp {
    let mut app = TestApp::new();
    add_account(&app.identity, "u-admin", "admin@example.com", "password123", "Avery Admin").await;
    seed_user(&app.store, "u-admin", "admin@example.com", true).await;
    app.login("admin@example.com", "password123").await;
    app
}

// =============================================================================
// Health & Catalog
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_products_list_and_missing_product() {
    let mut app = TestApp::new();
    app.store
        .seed(Table::Product, row(json!({
            "id": "vision",
            "name": "Vision Formula",
            "base_price": "39.99",
            "category": "supplement",
            "description": null,
        })))
        .await;

    let (status, body) = app.get("/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["products"][0]["name"], "Vision Formula");

    let (status, body) = app.get("/api/products/vision").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["id"], "vision");

    let (status, body) = app.get("/api/products/multivitamin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_pricing_quotes() {
    let mut app = TestApp::new();

    let (status, body) = app
        .get("/api/pricing/quote?product=vision&frequency=annual")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["price"]["amount"]), Decimal::new(38390, 2));

    let (status, body) = app
        .get("/api/pricing/distributor?product=vision&tier=30-pack")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["units"], 30);
    assert_eq!(decimal(&body["unit_price"]["amount"]), Decimal::new(6190, 2));
    assert_eq!(decimal(&body["price"]["amount"]), Decimal::new(185_700, 2));

    let (status, body) = app
        .get("/api/pricing/quote?product=multivitamin&frequency=monthly")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PricingDomainError");
    assert_eq!(body["message"], "unknown product: multivitamin");
}

#[tokio::test]
async fn test_malformed_query_uses_envelope() {
    let mut app = TestApp::new();
    let (status, body) = app.get("/api/pricing/quote?product=vision").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "ValidationFailed");
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_login_me_logout() {
    let mut app = TestApp::new();
    add_account(&app.identity, "u-1", "ada@example.com", "correct horse", "Ada Lovelace").await;

    let body = app.login("ada@example.com", "correct horse").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], "u-1");
    assert_eq!(body["user"]["full_name"], "Ada Lovelace");
    assert_eq!(body["subscriptions"], json!([]));

    let (status, body) = app.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");

    let (status, body) = app.post("/api/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].is_null());
    assert_eq!(app.identity.active_sessions().await, 0);

    let (status, body) = app.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unauthenticated");
}

#[tokio::test]
async fn test_bad_login_returns_envelope() {
    let mut app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/auth/login",
            json!({ "email": "bad@x.com", "password": "wrong" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "InvalidCredentials");
    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_register_then_login() {
    let mut app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "name": "Mary Somerville", "email": "mary@example.com", "password": "long enough" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["confirmation_required"], false);
    assert!(app.store.rows(Table::UserAccount).await.is_empty());

    let body = app.login("mary@example.com", "long enough").await;
    assert_eq!(body["user"]["full_name"], "Mary Somerville");
}

#[tokio::test]
async fn test_provider_outage_on_login() {
    let mut app = TestApp::new();
    app.identity.set_unavailable(true);
    let (status, body) = app
        .post(
            "/api/auth/login",
            json!({ "email": "ada@example.com", "password": "correct horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "ProviderUnavailable");
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_anonymous_order_is_rejected_before_writes() {
    let mut app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/orders",
            json!({ "address": sample_address_json(), "product": "vision", "frequency": "monthly" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unauthenticated");
    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_signed_in_order_and_account_views() {
    let mut app = signed_in_customer().await;
    let (status, body) = app
        .post(
            "/api/orders",
            json!({ "address": sample_address_json(), "product": "vision", "frequency": "monthly" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["order"]["amount"]["amount"]), Decimal::new(3999, 2));

    let (_, body) = app.get("/api/account/subscriptions").await;
    let subscriptions = body["subscriptions"].as_array().unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0]["status"], "ACTIVE");
    assert_eq!(subscriptions[0]["payments"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/account/addresses").await;
    assert_eq!(body["addresses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_failure_reports_progress() {
    let mut app = signed_in_customer().await;
    app.store
        .fail_on(Table::Payment, StoreOp::Insert, "disk full")
        .await;

    let (status, body) = app
        .post(
            "/api/orders",
            json!({ "address": sample_address_json(), "product": "neuro", "frequency": "annual" }),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "PaymentRecordingFailed");
    assert_eq!(body["progress"]["stage"], "ShipmentCreated");
    assert!(!body["message"].as_str().unwrap().contains("disk full"));
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_add_update_remove_clear() {
    let mut app = TestApp::new();
    let vision_monthly = json!({ "kind": "subscription", "frequency": "monthly" });

    let (status, body) = app
        .post(
            "/api/cart/add",
            json!({ "product": "vision", "option": vision_monthly, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["item_count"], 2);
    assert_eq!(decimal(&body["cart"]["subtotal"]["amount"]), Decimal::new(7998, 2));

    let (_, body) = app
        .post(
            "/api/cart/add",
            json!({ "product": "neuro", "option": { "kind": "distributor", "tier": "10-pack" } }),
        )
        .await;
    assert_eq!(body["cart"]["items"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .post("/api/cart/update", json!({ "item_id": "vision:monthly", "quantity": 1 }))
        .await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 1);

    let (status, body) = app
        .post("/api/cart/remove", json!({ "item_id": "nope:monthly" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    let (_, body) = app
        .post("/api/cart/update", json!({ "item_id": "vision:monthly", "quantity": 0 }))
        .await;
    assert_eq!(body["cart"]["items"].as_array().unwrap().len(), 1);

    let (_, body) = app.post("/api/cart/clear", json!({})).await;
    assert_eq!(body["cart"]["item_count"], 0);

    let (_, body) = app.get("/api/cart").await;
    assert_eq!(body["cart"]["items"], json!([]));
}

#[tokio::test]
async fn test_cart_rejects_unsold_option() {
    let mut app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/cart/add",
            json!({ "product": "vision", "option": { "kind": "one_time" } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PricingDomainError");
}

#[tokio::test]
async fn test_cart_line_quantity_is_capped() {
    let mut app = TestApp::new();
    let monthly = json!({ "kind": "subscription", "frequency": "monthly" });

    let (status, body) = app
        .post(
            "/api/cart/add",
            json!({ "product": "vision", "option": monthly, "quantity": 11 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationFailed");

    let (status, body) = app
        .post(
            "/api/cart/add",
            json!({ "product": "vision", "option": monthly, "quantity": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["cart"]["item_count"], 10);

    let (status, body) = app
        .post(
            "/api/cart/add",
            json!({ "product": "vision", "option": monthly, "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationFailed");

    let (status, body) = app
        .post(
            "/api/cart/update",
            json!({ "item_id": "vision:monthly", "quantity": 4_000_000_000_i64 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationFailed");

    let (_, body) = app.get("/api/cart").await;
    assert_eq!(body["cart"]["item_count"], 10);
}

#[tokio::test]
async fn test_cart_checkout_places_one_order_per_unit() {
    let mut app = signed_in_customer().await;
    app.post(
        "/api/cart/add",
        json!({ "product": "fortify", "option": { "kind": "subscription", "frequency": "annual" }, "quantity": 2 }),
    )
    .await;

    let (status, body) = app
        .post("/api/cart/checkout", json!({ "address": sample_address_json() }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(app.store.rows(Table::Subscription).await.len(), 2);

    let (_, body) = app.get("/api/cart").await;
    assert_eq!(body["cart"]["item_count"], 0);
}

#[tokio::test]
async fn test_anonymous_checkout_keeps_cart() {
    let mut app = TestApp::new();
    app.post(
        "/api/cart/add",
        json!({ "product": "vision", "option": { "kind": "subscription", "frequency": "monthly" } }),
    )
    .await;

    let (status, body) = app
        .post("/api/cart/checkout", json!({ "address": sample_address_json() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unauthenticated");

    let (_, body) = app.get("/api/cart").await;
    assert_eq!(body["cart"]["item_count"], 1);
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let mut app = TestApp::new();
    let (status, body) = app.get("/api/admin/users").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unauthenticated");

    let mut app = signed_in_customer().await;
    let (status, body) = app.get("/api/admin/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_admin_lists() {
    let mut app = signed_in_admin().await;
    for path in [
        "/api/admin/users",
        "/api/admin/products",
        "/api/admin/subscriptions",
        "/api/admin/payments",
        "/api/admin/shipments",
        "/api/admin/campaigns",
    ] {
        let (status, body) = app.get(path).await;
        assert_eq!(status, StatusCode::OK, "{path}: {body}");
        assert_eq!(body["success"], true);
    }
}

#[tokio::test]
async fn test_admin_grant_is_rechecked_per_request() {
    let mut app = signed_in_admin().await;
    let (status, _) = app.get("/api/admin/users").await;
    assert_eq!(status, StatusCode::OK);

    app.store
        .fail_on(Table::UserAccount, StoreOp::Select, "replica down")
        .await;
    let (status, body) = app.get("/api/admin/users").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "StoreUnavailable");
}

#[tokio::test]
async fn test_admin_subscription_status_transitions() {
    let mut app = signed_in_admin().await;
    let (_, body) = app
        .post(
            "/api/orders",
            json!({ "address": sample_address_json(), "product": "complete", "frequency": "monthly" }),
        )
        .await;
    let id = body["order"]["subscription_id"].as_str().unwrap().to_string();
    let uri = format!("/api/admin/subscriptions/{id}/status");

    let (status, body) = app.patch(&uri, json!({ "status": "PAUSED" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["subscription"]["status"], "PAUSED");

    let (status, body) = app.patch(&uri, json!({ "status": "CANCELED" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription"]["status"], "CANCELED");

    let (status, body) = app.patch(&uri, json!({ "status": "ACTIVE" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationFailed");

    let (status, _) = app
        .patch("/api/admin/subscriptions/missing/status", json!({ "status": "PAUSED" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_status_changes_apply_once() {
    let mut app = signed_in_admin().await;
    let (_, body) = app
        .post(
            "/api/orders",
            json!({ "address": sample_address_json(), "product": "complete", "frequency": "monthly" }),
        )
        .await;
    let id = body["order"]["subscription_id"].as_str().unwrap().to_string();
    let uri = format!("/api/admin/subscriptions/{id}/status");

    // Both requests read ACTIVE before either write lands.
    app.store
        .delay_on(Table::Subscription, StoreOp::Update, Duration::from_millis(100))
        .await;
    let mut cancel = app.clone();
    let mut pause = app.clone();
    let (canceled, paused) = tokio::join!(
        cancel.patch(&uri, json!({ "status": "CANCELED" })),
        pause.patch(&uri, json!({ "status": "PAUSED" })),
    );

    let outcomes = [canceled, paused];
    let winners: Vec<&Value> = outcomes
        .iter()
        .filter(|(status, _)| *status == StatusCode::OK)
        .map(|(_, body)| &body["subscription"]["status"])
        .collect();
    let losers: Vec<&Value> = outcomes
        .iter()
        .filter(|(status, _)| *status == StatusCode::BAD_REQUEST)
        .map(|(_, body)| &body["error"])
        .collect();
    assert_eq!(winners.len(), 1, "{outcomes:?}");
    assert_eq!(losers, vec!["ValidationFailed"]);

    let stored = app.store.rows(Table::Subscription).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(&stored[0]["status"], winners[0]);
}

#[tokio::test]
async fn test_admin_campaign_crud() {
    let mut app = signed_in_admin().await;

    let (status, body) = app
        .post(
            "/api/admin/campaigns",
            json!({ "name": "", "type": "email", "start_date": "2025-02-01", "budget": "500" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationFailed");

    let (status, body) = app
        .post(
            "/api/admin/campaigns",
            json!({ "name": "Spring Launch", "type": "email", "start_date": "2025-02-01", "budget": "500" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["campaign"]["status"], "DRAFT");
    let id = body["campaign"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/admin/campaigns/{id}");

    let (status, body) = app
        .patch(&uri, json!({ "status": "ACTIVE", "leads": 12 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["campaign"]["status"], "ACTIVE");
    assert_eq!(body["campaign"]["leads"], 12);

    let (_, body) = app.get(&uri).await;
    assert_eq!(body["campaign"]["name"], "Spring Launch");

    let (status, body) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], id.as_str());

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
