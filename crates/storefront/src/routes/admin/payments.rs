//! Payment listing.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::db::PaymentRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Payment;
use crate::routes::{Success, success};
use crate::state::AppState;

/// Build the payments router.
pub fn router() -> Router<AppState> {
    Router::new().route("/payments", get(index))
}

#[derive(Debug, Serialize)]
pub struct PaymentList {
    pub payments: Vec<Payment>,
}

pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Success<PaymentList>>> {
    let payments = PaymentRepository::new(state.store()).list().await?;
    Ok(success(PaymentList { payments }))
}
