//! Identity provider abstraction.
//!
//! Authentication itself is delegated: the provider owns credentials and
//! issues access tokens. The service only mirrors the account into
//! `user_account` (see [`crate::services::session`]).
//!
//! # Adapters
//!
//! - [`GoTrueClient`] - Supabase auth (`/auth/v1`)
//! - [`MemoryIdentityProvider`] - argon2-hashed accounts held in memory

mod gotrue;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use vitalis_core::{Email, EmailError, UserId};

pub use gotrue::GoTrueClient;
pub use memory::MemoryIdentityProvider;

/// Free-form profile data the provider stores next to the account.
pub type UserMetadata = Map<String, Value>;

/// An account as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl IdentityUser {
    /// Display name from metadata: `full_name`, then `name`, then the email's
    /// local part.
    #[must_use]
    pub fn display_name(&self) -> String {
        ["full_name", "name"]
            .into_iter()
            .filter_map(|key| self.user_metadata.get(key).and_then(Value::as_str))
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or_else(|| self.email.local_part())
            .to_string()
    }
}

/// A signed-in session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub user: IdentityUser,
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: IdentityUser,
    /// The provider wants the address confirmed before sign-in.
    pub confirmation_required: bool,
}

/// Errors from identity provider calls.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Email/password pair rejected.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Sign-up for an email that already has an account.
    #[error("user already registered")]
    UserAlreadyExists,

    /// Password rejected by the provider's policy.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    /// Access token is missing, expired, or revoked.
    #[error("invalid or expired access token")]
    InvalidToken,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with an unexpected error status.
    #[error("identity provider error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Provider response could not be parsed.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// Provider can't be reached or is failing.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    /// Whether the failure is the provider's (or the network's) rather than
    /// the caller's.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Unavailable(_) | Self::Parse(_) | Self::Api { .. }
        )
    }
}

/// Delegated authentication.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account.
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpOutcome, IdentityError>;

    /// Exchange an email/password pair for a session.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, IdentityError>;

    /// Resolve an access token to its account.
    async fn current_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;

    /// Revoke an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}
