//! Authentication route handlers.
//!
//! Each request gets its own [`SessionManager`]. The signed-in user and the
//! provider access token are carried between requests in the tower-sessions
//! session, and `resume` rebuilds the manager from them when needed.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use vitalis_core::{Email, UserId};

use super::ApiJson;
use crate::error::{AppError, ErrorKind, Result};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Subscription, User};
use crate::services::{Registration, SessionManager, SessionSnapshot};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(alias = "name")]
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Outcome of a login (or `me`) call.
#[derive(Debug, Serialize)]
pub struct SessionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub subscriptions: Vec<Subscription>,
}

impl SessionResult {
    fn signed_in(user: User, subscriptions: Vec<Subscription>) -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            user: Some(user),
            subscriptions,
        }
    }

    fn signed_out() -> Self {
        Self {
            success: true,
            error: None,
            message: Some("Signed out".to_string()),
            user: None,
            subscriptions: Vec::new(),
        }
    }
}

impl From<SessionSnapshot> for SessionResult {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self::signed_in(snapshot.user, snapshot.subscriptions)
    }
}

/// Outcome of a registration.
#[derive(Debug, Serialize)]
pub struct RegistrationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user_id: UserId,
    pub email: Email,
    pub confirmation_required: bool,
}

impl From<Registration> for RegistrationResult {
    fn from(registration: Registration) -> Self {
        let message = if registration.confirmation_required {
            "Check your email to confirm your account, then sign in"
        } else {
            "Account created, you can sign in now"
        };
        Self {
            success: true,
            error: None,
            message: Some(message.to_string()),
            user_id: registration.user_id,
            email: registration.email,
            confirmation_required: registration.confirmation_required,
        }
    }
}

/// Rebuild a session manager for the user stored in the HTTP session.
async fn resume(state: &AppState, current: &CurrentUser) -> SessionManager {
    state
        .session_manager()
        .resume(current.user(), current.token())
        .await
}

/// Handle login.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Json<SessionResult>> {
    let manager = state.session_manager();
    let snapshot = manager.login(&form.email, &form.password).await?;

    let token = manager
        .access_token()
        .await
        .ok_or_else(|| AppError::Internal("access token missing after login".to_string()))?;
    set_current_user(&session, &CurrentUser::signed_in(&snapshot.user, &token)).await?;

    Ok(Json(snapshot.into()))
}

/// Handle registration.
///
/// The account is created at the identity provider only; the `user_account`
/// row appears on first login.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterForm>,
) -> Result<Json<RegistrationResult>> {
    let registration = state
        .session_manager()
        .register(&form.full_name, &form.email, &form.password)
        .await?;
    Ok(Json(registration.into()))
}

/// Handle logout.
///
/// Signing out when already signed out succeeds.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
) -> Result<Json<SessionResult>> {
    if let Some(current) = current {
        resume(&state, &current).await.logout().await;
        clear_current_user(&session).await?;
    }
    Ok(Json(SessionResult::signed_out()))
}

/// Current user with freshly loaded subscriptions.
#[instrument(skip_all)]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<SessionResult>> {
    let manager = resume(&state, &current).await;
    manager.refresh_subscriptions().await?;

    let user = manager
        .current_user()
        .await
        .ok_or_else(|| AppError::Unauthenticated("You must be signed in".to_string()))?;
    Ok(Json(SessionResult::signed_in(
        user,
        manager.subscriptions().await,
    )))
}
