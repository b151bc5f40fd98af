//! Order placement handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use super::{ApiJson, Success, success};
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::services::{Identity, OrderRequest, OrderResult};
use crate::state::AppState;

/// Placed order body.
#[derive(Debug, Serialize)]
pub struct OrderBody {
    pub order: OrderResult,
}

/// Place a single subscription order.
///
/// Anonymous callers get the `Unauthenticated` envelope from the workflow
/// itself, before anything is written.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(current): OptionalAuth,
    ApiJson(request): ApiJson<OrderRequest>,
) -> Result<Json<Success<OrderBody>>> {
    let identity = current.map(|user| Identity::new(user.id));
    let order = state
        .order_workflow()
        .place_order(identity.as_ref(), request)
        .await?;
    Ok(success(OrderBody { order }))
}
