//! Order workflow against the in-memory store.
//!
//! Covers step ordering, payment/subscription consistency, failure
//! isolation at every step, the next-payment-date rule, and the step
//! timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use vitalis_core::{BillingFrequency, ProductKind, pricing};
use vitalis_integration_tests::sample_address;
use vitalis_storefront::error::ErrorKind;
use vitalis_storefront::services::{
    Identity, OrderError, OrderRequest, OrderStage, OrderWorkflow, StepFailure,
};
use vitalis_storefront::store::{MemoryStore, StoreCall, StoreOp, Table};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

fn workflow(store: &MemoryStore) -> OrderWorkflow {
    OrderWorkflow::new(Arc::new(store.clone())).with_start_date(start())
}

fn request(product: ProductKind, frequency: BillingFrequency) -> OrderRequest {
    OrderRequest {
        address: sample_address(),
        product,
        frequency,
        utc_offset_minutes: None,
        next_payment_override: None,
    }
}

fn inserts(calls: &[StoreCall]) -> Vec<Table> {
    calls
        .iter()
        .filter(|call| call.op == StoreOp::Insert)
        .map(|call| call.table)
        .collect()
}

fn amount_of(row: &serde_json::Map<String, Value>) -> Decimal {
    serde_json::from_value(row.get("amount").cloned().unwrap()).unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_vision_monthly_order() {
    let store = MemoryStore::new();
    let result = workflow(&store)
        .place_order(
            Some(&Identity::new("u1")),
            request(ProductKind::Vision, BillingFrequency::Monthly),
        )
        .await
        .unwrap();

    assert!(!result.subscription_id.is_blank());
    assert!(!result.payment_id.is_blank());
    assert!(!result.shipment_id.is_blank());
    assert_eq!(result.amount.amount, dec!(39.99));
    assert!(result.order_number.starts_with("ORD-"));
}

#[tokio::test]
async fn test_vision_annual_order() {
    let store = MemoryStore::new();
    let result = workflow(&store)
        .place_order(
            Some(&Identity::new("u1")),
            request(ProductKind::Vision, BillingFrequency::Annual),
        )
        .await
        .unwrap();

    assert_eq!(result.amount.amount, dec!(383.90));
    assert_eq!(
        result.amount.amount,
        (dec!(39.99) * dec!(0.8) * dec!(12)).round_dp(2)
    );
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_steps_run_in_order() {
    let store = MemoryStore::new();
    workflow(&store)
        .place_order(
            Some(&Identity::new("u1")),
            request(ProductKind::Neuro, BillingFrequency::Monthly),
        )
        .await
        .unwrap();

    assert_eq!(
        inserts(&store.calls().await),
        vec![
            Table::Address,
            Table::Subscription,
            Table::Shipping,
            Table::Payment
        ]
    );
}

#[tokio::test]
async fn test_payment_amount_matches_price_for_every_plan() {
    for product in ProductKind::ALL {
        for frequency in [BillingFrequency::Monthly, BillingFrequency::Annual] {
            let store = MemoryStore::new();
            workflow(&store)
                .place_order(Some(&Identity::new("u1")), request(product, frequency))
                .await
                .unwrap();

            let subscription = store.rows(Table::Subscription).await.pop().unwrap();
            let payment = store.rows(Table::Payment).await.pop().unwrap();
            assert_eq!(subscription["product_type"], product.as_str());
            assert_eq!(
                amount_of(&payment),
                pricing::price(product, frequency).unwrap().amount,
                "{product} {frequency}"
            );
            assert_eq!(payment["subscription_id"], subscription["id"]);
        }
    }
}

#[tokio::test]
async fn test_shipment_failure_stops_after_subscription() {
    let store = MemoryStore::new();
    store
        .fail_on(Table::Shipping, StoreOp::Insert, "shipping table offline")
        .await;

    let err = workflow(&store)
        .place_order(
            Some(&Identity::new("u1")),
            request(ProductKind::Vision, BillingFrequency::Monthly),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ShipmentCreationFailed);
    assert_eq!(store.rows(Table::Address).await.len(), 1);
    assert_eq!(store.rows(Table::Subscription).await.len(), 1);
    assert!(store.rows(Table::Shipping).await.is_empty());
    assert!(store.rows(Table::Payment).await.is_empty());
    // One attempt at the shipment, no retry, no payment attempt.
    assert_eq!(
        inserts(&store.calls().await),
        vec![Table::Address, Table::Subscription, Table::Shipping]
    );

    let progress = err.progress().unwrap();
    assert_eq!(progress.stage, OrderStage::SubscriptionCreated);
    assert!(progress.address_id.is_some());
    assert!(progress.subscription_id.is_some());
    assert!(progress.shipment_id.is_none());
}

#[tokio::test]
async fn test_each_step_failure_reports_its_kind() {
    let cases = [
        (Table::Address, ErrorKind::AddressCreationFailed, 1),
        (Table::Subscription, ErrorKind::SubscriptionCreationFailed, 2),
        (Table::Shipping, ErrorKind::ShipmentCreationFailed, 3),
        (Table::Payment, ErrorKind::PaymentRecordingFailed, 4),
    ];

    for (table, kind, attempted) in cases {
        let store = MemoryStore::new();
        store.fail_on(table, StoreOp::Insert, "boom").await;

        let err = workflow(&store)
            .place_order(
                Some(&Identity::new("u1")),
                request(ProductKind::Fortify, BillingFrequency::Annual),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), kind, "failing {table}");
        assert_eq!(inserts(&store.calls().await).len(), attempted, "failing {table}");
    }
}

#[tokio::test]
async fn test_next_payment_date_rule() {
    let store = MemoryStore::new();
    let monthly = workflow(&store)
        .place_order(
            Some(&Identity::new("u1")),
            request(ProductKind::Vision, BillingFrequency::Monthly),
        )
        .await
        .unwrap();
    let annual = workflow(&store)
        .place_order(
            Some(&Identity::new("u1")),
            request(ProductKind::Vision, BillingFrequency::Annual),
        )
        .await
        .unwrap();

    assert_eq!(monthly.start_date, start());
    assert_eq!(
        monthly.next_payment_due_date,
        NaiveDate::from_ymd_opt(2025, 2, 15).unwrap()
    );
    assert_eq!(
        annual.next_payment_due_date,
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    );
}

#[tokio::test]
async fn test_explicit_next_payment_override() {
    let store = MemoryStore::new();
    let override_date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let mut req = request(ProductKind::Neuro, BillingFrequency::Monthly);
    req.next_payment_override = Some(override_date);

    let result = workflow(&store)
        .place_order(Some(&Identity::new("u1")), req)
        .await
        .unwrap();

    assert_eq!(result.next_payment_due_date, override_date);
}

// ============================================================================
// Validation happens before any write
// ============================================================================

#[tokio::test]
async fn test_missing_identity_writes_nothing() {
    let store = MemoryStore::new();
    let err = workflow(&store)
        .place_order(None, request(ProductKind::Vision, BillingFrequency::Monthly))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Unauthenticated));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_blank_user_id_is_unauthenticated() {
    let store = MemoryStore::new();
    let err = workflow(&store)
        .place_order(
            Some(&Identity::new("  ")),
            request(ProductKind::Vision, BillingFrequency::Monthly),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_incomplete_address_writes_nothing() {
    let store = MemoryStore::new();
    let mut req = request(ProductKind::Vision, BillingFrequency::Monthly);
    req.address.city = "   ".to_string();
    req.address.postal_code = String::new();

    let err = workflow(&store)
        .place_order(Some(&Identity::new("u1")), req)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    let message = err.to_string();
    assert!(message.contains("city"));
    assert!(message.contains("postal_code"));
    assert!(store.calls().await.is_empty());
}

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stalled_step_times_out() {
    let store = MemoryStore::new();
    store
        .delay_on(Table::Subscription, StoreOp::Insert, Duration::from_secs(60))
        .await;

    let err = workflow(&store)
        .with_step_timeout(Duration::from_secs(5))
        .place_order(
            Some(&Identity::new("u1")),
            request(ProductKind::Vision, BillingFrequency::Monthly),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SubscriptionCreationFailed);
    match err {
        OrderError::SubscriptionCreationFailed { progress, source } => {
            assert!(matches!(source, StepFailure::TimedOut(d) if d == Duration::from_secs(5)));
            assert_eq!(progress.stage, OrderStage::AddressCreated);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.rows(Table::Shipping).await.is_empty());
}
