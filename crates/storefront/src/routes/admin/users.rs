//! User account listing.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::db::UserRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::routes::{Success, success};
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(index))
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

/// All mirrored accounts, newest first.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Success<UserList>>> {
    let users = UserRepository::new(state.store()).list().await?;
    Ok(success(UserList { users }))
}
