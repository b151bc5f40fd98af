//! Admin API (requires `is_admin` on the caller's `user_account` row).
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so
//! anonymous callers get `Unauthenticated` and signed-in non-admins get
//! `Forbidden`.

pub mod campaigns;
pub mod payments;
pub mod products;
pub mod shipments;
pub mod subscriptions;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the admin router (mounted at `/api/admin`).
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(campaigns::router())
        .merge(products::router())
        .merge(users::router())
        .merge(subscriptions::router())
        .merge(payments::router())
        .merge(shipments::router())
}
