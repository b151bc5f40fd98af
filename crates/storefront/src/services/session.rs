//! Account session manager.
//!
//! Wraps the identity provider and keeps the signed-in user's state: their
//! mirrored `user_account` row, their subscriptions (with payments), and the
//! provider access token. State lives in a small moka cache under fixed keys,
//! and changes to the current user are published on a `watch` channel.
//!
//! Login mirrors the provider account into `user_account` the first time it
//! sees it. Registration does not; the row appears on first login.
//!
//! Every store round trip is bounded by the store timeout, the same budget an
//! order step gets.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use vitalis_core::{Email, UserId};

use crate::db::{RepositoryError, SubscriptionRepository, UserRepository};
use crate::error::{ErrorKind, clear_sentry_user, set_sentry_user};
use crate::identity::{IdentityError, IdentityProvider, IdentityUser, UserMetadata};
use crate::models::{NewUser, Subscription, User};
use crate::services::orders::DEFAULT_STEP_TIMEOUT;
use crate::store::{PersistentStore, StoreError};

/// Fixed cache keys for session state.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum SessionKey {
    CurrentUser,
    Subscriptions,
    AccessToken,
}

impl SessionKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CurrentUser => "current_user",
            Self::Subscriptions => "subscriptions",
            Self::AccessToken => "access_token",
        }
    }
}

/// Cached session values.
#[derive(Debug, Clone)]
enum SessionValue {
    User(Box<User>),
    Subscriptions(Arc<Vec<Subscription>>),
    AccessToken(SecretString),
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    ValidationFailed(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Sign-in is temporarily unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Could not set up your account: {0}")]
    MirrorRowCreationFailed(#[source] RepositoryError),

    #[error("An account with this email already exists")]
    UserAlreadyExists,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Could not load account data: {0}")]
    StoreUnavailable(#[source] RepositoryError),
}

impl SessionError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) | Self::UserAlreadyExists | Self::WeakPassword(_) => {
                ErrorKind::ValidationFailed
            }
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::MirrorRowCreationFailed(_) => ErrorKind::MirrorRowCreationFailed,
            Self::NotSignedIn => ErrorKind::Unauthenticated,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }
}

/// Signed-in state returned by [`SessionManager::login`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user: User,
    pub subscriptions: Vec<Subscription>,
}

/// Outcome of [`SessionManager::register`].
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user_id: UserId,
    pub email: Email,
    /// The provider wants the address confirmed before the first login.
    pub confirmation_required: bool,
}

/// One user's session.
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn PersistentStore>,
    cache: Cache<SessionKey, SessionValue>,
    current: watch::Sender<Option<User>>,
    store_timeout: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn PersistentStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            identity,
            store,
            cache: Cache::builder().max_capacity(8).build(),
            current,
            store_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Bound each store round trip by `timeout`.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Adopt a user already signed in elsewhere (e.g. from an HTTP session).
    pub async fn resume(self, user: User, access_token: SecretString) -> Self {
        self.cache
            .insert(SessionKey::AccessToken, SessionValue::AccessToken(access_token))
            .await;
        self.set_user(user).await;
        self
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for blank or malformed input (provider not called)
    /// - `InvalidCredentials` when the provider rejects the pair (store untouched)
    /// - `ProviderUnavailable` when the provider can't be reached
    /// - `MirrorRowCreationFailed` when the `user_account` row can't be
    ///   read or created
    ///
    /// A failure to load subscriptions is logged and leaves the list empty.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionSnapshot, SessionError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(SessionError::ValidationFailed(
                "Email and password are required".to_string(),
            ));
        }
        let email =
            Email::parse(email).map_err(|e| SessionError::ValidationFailed(e.to_string()))?;

        let session = match self.identity.sign_in_with_password(&email, password).await {
            Ok(session) => session,
            Err(IdentityError::InvalidCredentials) => {
                tracing::warn!(email = %email, "Login rejected by identity provider");
                return Err(SessionError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(error = %e, "Identity provider sign-in failed");
                return Err(SessionError::ProviderUnavailable(e.to_string()));
            }
        };

        let user = self.ensure_mirror_row(&session.user).await?;
        let subscriptions = match self
            .bounded(
                SubscriptionRepository::new(self.store.as_ref()).list_for_user_with_payments(&user.id),
            )
            .await
        {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::warn!(
                    user_id = %user.id,
                    error = %e,
                    "Failed to load subscriptions at login"
                );
                Vec::new()
            }
        };

        self.cache
            .insert(
                SessionKey::AccessToken,
                SessionValue::AccessToken(session.access_token),
            )
            .await;
        self.set_subscriptions(subscriptions.clone()).await;
        self.set_user(user.clone()).await;
        set_sentry_user(&user.id, Some(user.email.as_str()));

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(SessionSnapshot {
            user,
            subscriptions,
        })
    }

    /// Create a provider account.
    ///
    /// Does not sign in and does not create the `user_account` row.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed`, `UserAlreadyExists`, `WeakPassword`, or
    /// `ProviderUnavailable`.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, SessionError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(SessionError::ValidationFailed(
                "Name, email and password are required".to_string(),
            ));
        }
        let email =
            Email::parse(email).map_err(|e| SessionError::ValidationFailed(e.to_string()))?;

        let mut metadata = UserMetadata::new();
        metadata.insert("full_name".to_string(), json!(name));

        let outcome = self
            .identity
            .sign_up(&email, password, metadata)
            .await
            .map_err(|e| match e {
                IdentityError::UserAlreadyExists => SessionError::UserAlreadyExists,
                IdentityError::WeakPassword(message) => SessionError::WeakPassword(message),
                IdentityError::InvalidEmail(e) => SessionError::ValidationFailed(e.to_string()),
                other => {
                    tracing::error!(error = %other, "Identity provider sign-up failed");
                    SessionError::ProviderUnavailable(other.to_string())
                }
            })?;

        tracing::info!(user_id = %outcome.user.id, "User registered");
        Ok(Registration {
            user_id: outcome.user.id,
            email: outcome.user.email,
            confirmation_required: outcome.confirmation_required,
        })
    }

    /// Sign out and forget all session state.
    ///
    /// A provider sign-out failure is logged; local state is cleared anyway.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(token) = self.access_token().await
            && let Err(e) = self.identity.sign_out(token.expose_secret()).await
        {
            tracing::warn!(error = %e, "Identity provider sign-out failed");
        }
        self.cache.invalidate_all();
        self.current.send_replace(None);
        clear_sentry_user();
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        match self.cache.get(&SessionKey::CurrentUser).await {
            Some(SessionValue::User(user)) => Some(*user),
            _ => None,
        }
    }

    /// The signed-in user's subscriptions as of the last load.
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        match self.cache.get(&SessionKey::Subscriptions).await {
            Some(SessionValue::Subscriptions(subscriptions)) => subscriptions.as_ref().clone(),
            _ => Vec::new(),
        }
    }

    /// The provider access token for the signed-in user.
    pub async fn access_token(&self) -> Option<SecretString> {
        match self.cache.get(&SessionKey::AccessToken).await {
            Some(SessionValue::AccessToken(token)) => Some(token),
            _ => None,
        }
    }

    /// Reload subscriptions (with payments) from the store.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a current user, or `StoreUnavailable`
    /// if the select fails.
    #[instrument(skip(self))]
    pub async fn refresh_subscriptions(&self) -> Result<Vec<Subscription>, SessionError> {
        let user = self.current_user().await.ok_or(SessionError::NotSignedIn)?;
        let subscriptions = self
            .bounded(
                SubscriptionRepository::new(self.store.as_ref()).list_for_user_with_payments(&user.id),
            )
            .await
            .map_err(SessionError::StoreUnavailable)?;
        self.set_subscriptions(subscriptions.clone()).await;
        Ok(subscriptions)
    }

    /// Watch the current user.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }

    async fn set_user(&self, user: User) {
        self.cache
            .insert(SessionKey::CurrentUser, SessionValue::User(Box::new(user.clone())))
            .await;
        self.current.send_replace(Some(user));
    }

    async fn set_subscriptions(&self, subscriptions: Vec<Subscription>) {
        self.cache
            .insert(
                SessionKey::Subscriptions,
                SessionValue::Subscriptions(Arc::new(subscriptions)),
            )
            .await;
    }

    /// Find the `user_account` row for a provider account, creating it on
    /// first sight.
    async fn ensure_mirror_row(&self, account: &IdentityUser) -> Result<User, SessionError> {
        let users = UserRepository::new(self.store.as_ref());
        if let Some(user) = self
            .bounded(users.get_by_id(&account.id))
            .await
            .map_err(SessionError::MirrorRowCreationFailed)?
        {
            return Ok(user);
        }

        let new_user = NewUser {
            id: account.id.clone(),
            full_name: account.display_name(),
            email: account.email.clone(),
            is_admin: false,
        };
        match self.bounded(users.create(&new_user)).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Created user_account row");
                Ok(user)
            }
            // Lost a race with a concurrent first login.
            Err(RepositoryError::Conflict(_)) => self
                .bounded(users.get_by_id(&account.id))
                .await
                .map_err(SessionError::MirrorRowCreationFailed)?
                .ok_or(SessionError::MirrorRowCreationFailed(RepositoryError::NotFound)),
            Err(e) => {
                tracing::error!(user_id = %account.id, error = %e, "Failed to create user_account row");
                Err(SessionError::MirrorRowCreationFailed(e))
            }
        }
    }

    /// Run one store round trip under the store timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, RepositoryError> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Store(StoreError::Unavailable(format!(
                "timed out after {:?}",
                self.store_timeout
            )))),
        }
    }
}
