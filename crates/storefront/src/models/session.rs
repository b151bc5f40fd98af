//! Session-related types.
//!
//! Types stored in the tower-sessions session for authentication and cart state.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use vitalis_core::{Email, UserId};

use super::User;

/// Session-stored user identity.
///
/// `Debug` is implemented by hand so the access token never reaches logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity-provider user id (also the `user_account` id).
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    /// Identity-provider access token, used for sign-out.
    pub access_token: String,
}

impl CurrentUser {
    /// Session entry for a freshly signed-in user.
    #[must_use]
    pub fn signed_in(user: &User, access_token: &SecretString) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
            access_token: access_token.expose_secret().to_owned(),
        }
    }

    /// The mirrored row as it was at sign-in.
    #[must_use]
    pub fn user(&self) -> User {
        User {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }

    #[must_use]
    pub fn token(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("is_admin", &self.is_admin)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";
}
